use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::KiraError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub fn user_agent() -> String {
    format!("kira-dc/{}", env!("CARGO_PKG_VERSION"))
}

pub fn build_client<E>(timeout: Duration, on_error: E) -> Result<Client, KiraError>
where
    E: Fn(String) -> KiraError,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&user_agent()).map_err(|err| on_error(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| on_error(err.to_string()))
}

/// Passes successful responses through and turns anything else into the
/// error built by `on_status` from the status code and response body.
pub fn check_status<S>(
    response: Response,
    fallback: &str,
    on_status: S,
) -> Result<Response, KiraError>
where
    S: FnOnce(u16, String) -> KiraError,
{
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .ok()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    Err(on_status(status, message))
}

pub fn encode_url_component(value: &str) -> String {
    let mut out = String::new();
    for byte in value.as_bytes() {
        let ch = *byte as char;
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' || ch == '~' {
            out.push(ch);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
