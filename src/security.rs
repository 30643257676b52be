//! Content-Security-Policy strings and URL checks.
//!
//! The two CSP strings are observable output: pages and tests compare them
//! byte for byte, so change them only together with their consumers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use url::Url;

use crate::config::Environment;
use crate::error::{BridgeError, Result};

/// Development policy: inline/eval allowed, local dev server reachable.
pub const DEVELOPMENT_CSP: &str = "default-src 'self' 'unsafe-inline' 'unsafe-eval' data: blob: http://localhost:* ws://localhost:*; script-src 'self' 'unsafe-inline' 'unsafe-eval' http://localhost:*; style-src 'self' 'unsafe-inline'; img-src 'self' data: blob: http://localhost:*; connect-src 'self' http://localhost:* ws://localhost:*";

/// Production policy template; `{NONCE}` is replaced per page load.
pub const PRODUCTION_CSP_TEMPLATE: &str = "default-src 'self'; script-src 'self' 'nonce-{NONCE}'; style-src 'self' 'nonce-{NONCE}'; img-src 'self' data:; font-src 'self'; connect-src 'self'; object-src 'none'; base-uri 'self'; form-action 'self'; frame-ancestors 'none'";

const NONCE_PLACEHOLDER: &str = "{NONCE}";

/// Schemes `shell:openExternal` may hand to the OS.
pub const ALLOWED_EXTERNAL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Policy for `environment`. The nonce is ignored in development.
pub fn content_security_policy(environment: Environment, nonce: &str) -> String {
    match environment {
        Environment::Development => DEVELOPMENT_CSP.to_string(),
        Environment::Production => PRODUCTION_CSP_TEMPLATE.replace(NONCE_PLACEHOLDER, nonce),
    }
}

/// Fresh 128-bit nonce, base64 encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Parse `raw` and reject schemes other than [`ALLOWED_EXTERNAL_SCHEMES`].
pub fn validate_external_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| BridgeError::validation(format!("invalid URL '{raw}': {e}")))?;
    if !ALLOWED_EXTERNAL_SCHEMES.contains(&url.scheme()) {
        return Err(BridgeError::validation(format!(
            "scheme '{}' is not allowed for external URLs",
            url.scheme()
        )));
    }
    Ok(url)
}
