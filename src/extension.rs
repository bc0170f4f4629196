//! Companion browser extension distribution
//!
//! Packages the unpacked extension source directory into a gzipped tar
//! archive, built in memory per request so edits to the source directory
//! are picked up without a restart.

use crate::{RelayError, Result};
use flate2::{write::GzEncoder, Compression};
use std::path::Path;
use tracing::info;

/// Download filename for the bundle
pub const BUNDLE_FILENAME: &str = "hubrelay-extension.tar.gz";

/// Content type of the bundle
pub const BUNDLE_CONTENT_TYPE: &str = "application/gzip";

/// Build the extension bundle from the given source directory
pub fn build_bundle(source_dir: &Path) -> Result<Vec<u8>> {
    if !source_dir.is_dir() {
        return Err(RelayError::Extension(format!(
            "extension directory not found: {}",
            source_dir.display()
        )));
    }

    let encoder = GzEncoder::new(Vec::new(), Compression::best());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(".", source_dir)
        .map_err(|e| RelayError::Extension(format!("failed to archive extension: {}", e)))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| RelayError::Extension(format!("failed to finish archive: {}", e)))?;
    let bytes = encoder
        .finish()
        .map_err(|e| RelayError::Extension(format!("failed to finish compression: {}", e)))?;

    info!(
        source = %source_dir.display(),
        bytes = bytes.len(),
        "Built extension bundle"
    );
    Ok(bytes)
}
