//! Remote file retrieval
//!
//! Single-GET helper used by upload flows that ingest a file from a
//! URL. No retries and no size cap here; callers impose their own
//! limits before storing.

use crate::error::{GranaryError, Result};
use crate::sniff;

/// Fetch a remote file, returning its bytes and a cleaned content type.
///
/// Only a 200 response counts as success. The content type comes from
/// the response header when present, otherwise from sniffing the body;
/// any `;charset=...` style parameter is stripped either way.
pub async fn fetch_url(client: &reqwest::Client, url: &str) -> Result<(Vec<u8>, String)> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| GranaryError::FetchFailed(format!("request error: {e}")))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(GranaryError::FetchFailed(format!(
            "status: {}",
            status.as_u16()
        )));
    }

    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let data = response
        .bytes()
        .await
        .map_err(|e| GranaryError::FetchFailed(format!("body read error: {e}")))?
        .to_vec();

    let content_type = clean_content_type(&header_type, &data);
    Ok((data, content_type))
}

fn clean_content_type(header_type: &str, data: &[u8]) -> String {
    let raw = if header_type.is_empty() {
        sniff::detect_content_type(data)
    } else {
        header_type
    };
    match raw.find(';') {
        Some(idx) => raw[..idx].trim().to_string(),
        None => raw.to_string(),
    }
}
