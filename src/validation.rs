//! Request validation for player ids, config identifiers, JSON bodies and static paths.

use std::path::{Component, Path, PathBuf};

/// Maximum length of a player id or a config identifier.
pub const MAX_ID_LEN: usize = 64;

/// Validation errors with messages suitable for API error bodies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} is too long (maximum {max} characters)")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} contains invalid characters: {chars}")]
    InvalidCharacters { field: &'static str, chars: String },

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("invalid path")]
    InvalidPath,
}

fn collect_invalid(value: &str, allowed: impl Fn(char) -> bool) -> Option<String> {
    let mut bad: Vec<char> = value.chars().filter(|c| !allowed(*c)).collect();
    if bad.is_empty() {
        return None;
    }
    bad.sort_unstable();
    bad.dedup();
    Some(
        bad.into_iter()
            .map(|c| {
                if c.is_control() {
                    format!("\\u{{{:04x}}}", c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect(),
    )
}

fn validate_with(
    field: &'static str,
    value: &str,
    allowed: impl Fn(char) -> bool,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    if trimmed.chars().count() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_ID_LEN,
        });
    }
    if let Some(chars) = collect_invalid(trimmed, allowed) {
        return Err(ValidationError::InvalidCharacters { field, chars });
    }
    Ok(trimmed.to_string())
}

/// Validate a player id. Chat platforms hand out numeric ids, the web client may send
/// anything it read from the query string, so accept ASCII alphanumerics plus `_` and `-`.
pub fn validate_player_id(id: &str) -> Result<String, ValidationError> {
    validate_with("user_id", id, |c| {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    })
}

/// Validate a move, boss or action identifier. Identifiers are case-folded to lowercase.
pub fn validate_identifier(field: &'static str, id: &str) -> Result<String, ValidationError> {
    let lowered = id.trim().to_ascii_lowercase();
    validate_with(field, &lowered, |c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
    })
}

/// Parse a JSON request body with a size limit. Leading NULs are stripped.
pub fn secure_json_parse<T>(content: &[u8], max_bytes: usize) -> Result<T, ValidationError>
where
    T: serde::de::DeserializeOwned,
{
    if content.len() > max_bytes {
        return Err(ValidationError::BodyTooLarge { limit: max_bytes });
    }
    let start = content.iter().take_while(|b| **b == 0).count();
    let body = &content[start..];
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ValidationError::Missing { field: "body" });
    }
    serde_json::from_slice(body).map_err(|e| ValidationError::MalformedJson(e.to_string()))
}

/// Resolve a request path under `root`, rejecting traversal, absolute and hidden segments.
pub fn secure_static_path(root: &Path, request_path: &str) -> Result<PathBuf, ValidationError> {
    let relative = request_path.trim_start_matches('/');
    if relative.is_empty() || relative.contains('\\') || relative.contains('\0') {
        return Err(ValidationError::InvalidPath);
    }
    let mut path = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                if part.to_string_lossy().starts_with('.') {
                    return Err(ValidationError::InvalidPath);
                }
                path.push(part);
            }
            _ => return Err(ValidationError::InvalidPath),
        }
    }
    if !path.starts_with(root) {
        return Err(ValidationError::InvalidPath);
    }
    Ok(path)
}
