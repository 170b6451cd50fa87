use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use dca_execution::ExchangeError;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// API credentials. `api_secret` is the base64 string issued by the venue.
#[derive(Clone)]
pub struct CoinbaseCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl CoinbaseCredentials {
    pub fn new(api_key: String, api_secret: String, passphrase: String) -> Self {
        Self {
            api_key,
            api_secret,
            passphrase,
        }
    }
}

impl std::fmt::Debug for CoinbaseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinbaseCredentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Base64 HMAC-SHA256 of `timestamp + METHOD + path + body`, keyed with the
/// base64-decoded secret.
pub fn sign_request(
    secret_b64: &str,
    timestamp: i64,
    method: &str,
    path: &str,
    body: &str,
) -> Result<String, ExchangeError> {
    let key = BASE64
        .decode(secret_b64)
        .map_err(|e| ExchangeError::Transport(format!("invalid api secret encoding: {e}")))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| ExchangeError::Transport(format!("hmac init failed: {e}")))?;

    mac.update(timestamp.to_string().as_bytes());
    mac.update(method.to_uppercase().as_bytes());
    mac.update(path.as_bytes());
    mac.update(body.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

pub(crate) fn auth_headers(
    creds: &CoinbaseCredentials,
    timestamp: i64,
    method: &str,
    path: &str,
    body: &str,
) -> Result<HeaderMap, ExchangeError> {
    let signature = sign_request(&creds.api_secret, timestamp, method, path, body)?;

    let mut headers = HeaderMap::new();
    headers.insert("cb-access-key", header_value("CB-ACCESS-KEY", &creds.api_key)?);
    headers.insert("cb-access-sign", header_value("CB-ACCESS-SIGN", &signature)?);
    headers.insert(
        "cb-access-timestamp",
        header_value("CB-ACCESS-TIMESTAMP", &timestamp.to_string())?,
    );
    headers.insert(
        "cb-access-passphrase",
        header_value("CB-ACCESS-PASSPHRASE", &creds.passphrase)?,
    );
    Ok(headers)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ExchangeError> {
    HeaderValue::from_str(value)
        .map_err(|e| ExchangeError::Transport(format!("invalid {name} header: {e}")))
}
