//! Static HTML pages served to the browser during login and extension download

/// Shared card styling for the browser-facing pages
const CARD_STYLE: &str = r#"
  body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
    display: flex;
    flex-direction: column;
    align-items: center;
    justify-content: center;
    min-height: 100vh;
    margin: 0;
    background-color: #f6f8fa;
    color: #24292e;
  }
  .card {
    background-color: white;
    border-radius: 6px;
    box-shadow: 0 4px 12px rgba(0, 0, 0, 0.15);
    padding: 32px;
    text-align: center;
    max-width: 600px;
    width: 90%;
  }
  h1 { margin: 0 0 16px 0; }
  p { margin: 0 0 24px 0; color: #57606a; line-height: 1.5; }
  .button {
    background-color: #2da44e;
    color: white;
    border: none;
    border-radius: 6px;
    padding: 12px 20px;
    font-size: 16px;
    font-weight: 500;
    cursor: pointer;
    text-decoration: none;
    display: inline-block;
  }
  .button:hover { background-color: #2c974b; }
"#;

/// Login page prompting the user to start the OAuth flow
pub fn login_page() -> String {
    format!(
        r#"<html>
  <head>
    <title>GitHub Authentication</title>
    <style>{style}</style>
  </head>
  <body>
    <div class="card">
      <h1>GitHub Authentication</h1>
      <p>Connect your GitHub account to use with your chat assistant</p>
      <a href="/auth/github" class="button">Login with GitHub</a>
    </div>
  </body>
</html>"#,
        style = CARD_STYLE
    )
}

/// Page shown after a successful OAuth callback
pub fn success_page() -> String {
    format!(
        r#"<html>
  <head>
    <title>Authentication Successful</title>
    <style>{style}
      svg {{ fill: #2da44e; width: 64px; height: 64px; margin-bottom: 16px; }}
    </style>
  </head>
  <body>
    <div class="card">
      <svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24">
        <path d="M12 2C6.48 2 2 6.48 2 12s4.48 10 10 10 10-4.48 10-10S17.52 2 12 2zm-2 15l-5-5 1.41-1.41L10 14.17l7.59-7.59L19 8l-9 9z"/>
      </svg>
      <h1>Successfully Connected</h1>
      <p>You've authenticated with GitHub. You can close this window and return to your assistant.</p>
    </div>
  </body>
</html>"#,
        style = CARD_STYLE
    )
}

/// Extension download page with install instructions
///
/// `server_url` is substituted into the instructions so the user can point
/// the extension at this deployment.
pub fn extension_page(server_url: &str) -> String {
    format!(
        r#"<html>
  <head>
    <title>HubRelay Browser Extension</title>
    <style>{style}
      .instructions {{ text-align: left; margin-top: 32px; }}
      .instructions h2 {{ font-size: 18px; margin-bottom: 16px; }}
      .instructions ol {{ margin-left: 24px; }}
      .instructions li {{ margin-bottom: 8px; }}
    </style>
  </head>
  <body>
    <div class="card">
      <h1>HubRelay Browser Extension</h1>
      <p>Download the browser extension to connect your chat assistant to GitHub repositories</p>
      <a href="/extension/download" class="button">Download Extension</a>

      <div class="instructions">
        <h2>Installation Instructions:</h2>
        <ol>
          <li>Download the extension archive</li>
          <li>Extract it to a folder on your computer</li>
          <li>Open your browser's extensions page:</li>
          <ul>
            <li>Chrome: chrome://extensions</li>
            <li>Edge: edge://extensions</li>
            <li>Brave: brave://extensions</li>
          </ul>
          <li>Enable "Developer mode" using the toggle in the top-right corner</li>
          <li>Click "Load unpacked" and select the extracted folder</li>
          <li>Click the extension icon and enter this server URL: <strong>{server_url}</strong></li>
        </ol>
      </div>
    </div>
  </body>
</html>"#,
        style = CARD_STYLE,
        server_url = server_url
    )
}
