use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// URL prefix the reports directory is served under.
pub const REPORTS_URL_PREFIX: &str = "/reports";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Missing data")]
    MissingData,

    #[error("Invalid base64 payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedReport {
    pub success: bool,
    pub url: String,
}

/// Whitespace runs become `_`, anything outside `[A-Za-z0-9_.]` is dropped.
pub fn sanitize_stem(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len());
    let mut in_space = false;
    for ch in filename.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
            out.push(ch);
        }
    }
    out
}

pub fn report_filename(filename: &str, millis: i64) -> String {
    format!("{}_{}.pdf", sanitize_stem(filename), millis)
}

/// Decode a base64 PDF, optionally carrying a `data:...;base64,` prefix.
pub fn decode_pdf(pdf_base64: &str) -> Result<Vec<u8>, ReportError> {
    let payload = match pdf_base64.find("base64,") {
        Some(idx) if pdf_base64.starts_with("data:") => &pdf_base64[idx + "base64,".len()..],
        _ => pdf_base64,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

pub async fn save_report(
    dir: &Path,
    pdf_base64: &str,
    filename: &str,
) -> Result<SavedReport, ReportError> {
    if pdf_base64.is_empty() || filename.is_empty() {
        return Err(ReportError::MissingData);
    }

    let bytes = decode_pdf(pdf_base64)?;
    let name = report_filename(filename, Utc::now().timestamp_millis());

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&name), &bytes).await?;
    info!("Saved report {} ({} bytes)", name, bytes.len());

    Ok(SavedReport {
        success: true,
        url: format!("{}/{}", REPORTS_URL_PREFIX, name),
    })
}
