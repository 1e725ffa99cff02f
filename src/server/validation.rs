use bytes::Bytes;

use crate::config::ServerConfig;
use crate::ingest::DocumentTypeClassifier;
use crate::server::response::ApiError;

const MAX_CHAT_TITLE_LEN: usize = 200;

/// A file received in a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Bytes,
}

/// Keeps `[0-9A-Za-z_]` in the file stem and preserves the extension.
pub fn sanitize_file_name(name: &str) -> String {
    // Browsers on some platforms send the full client-side path
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let (stem, extension) = match base.rfind('.') {
        Some(i) if i > 0 => base.split_at(i),
        _ => (base, ""),
    };

    let stem: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let stem = if stem.is_empty() { "document".to_string() } else { stem };

    let extension: String = extension
        .chars()
        .filter(|c| *c == '.' || c.is_ascii_alphanumeric())
        .collect();

    format!("{stem}{extension}")
}

/// Checks an upload against the configured limits and supported types.
pub fn validate_upload(
    files: &[UploadedFile],
    config: &ServerConfig,
    classifier: &dyn DocumentTypeClassifier,
) -> Result<(), ApiError> {
    if files.is_empty() {
        return Err(ApiError::bad_request("No files were uploaded."));
    }
    if files.len() > config.file_count_limit {
        return Err(ApiError::bad_request(format!(
            "Too many files uploaded. Max file count is {}.",
            config.file_count_limit
        )));
    }

    for file in files {
        if file.content.is_empty() {
            return Err(ApiError::bad_request(format!(
                "File {} is empty.",
                file.file_name
            )));
        }
        if file.content.len() as u64 > config.file_size_limit {
            return Err(ApiError::bad_request(format!(
                "File {} size exceeds the limit.",
                file.file_name
            )));
        }
        if !classifier.is_supported(&file.file_name) {
            let extension = file
                .file_name
                .rfind('.')
                .map(|i| &file.file_name[i..])
                .unwrap_or_default();
            return Err(ApiError::bad_request(format!(
                "Unsupported file type: {extension}"
            )));
        }
    }
    Ok(())
}

pub fn validate_chat_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::bad_request("Chat title cannot be empty"));
    }
    if title.chars().count() > MAX_CHAT_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "Chat title cannot exceed {MAX_CHAT_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Human-readable byte count with at most one decimal, e.g. `1.5KB`.
pub fn readable_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}{}", rounded as u64, UNITS[unit])
    } else {
        format!("{rounded:.1}{}", UNITS[unit])
    }
}
