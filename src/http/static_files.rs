use std::path::Path;
use tokio::fs;

use super::response::Response;
use crate::validation::secure_static_path;

/// Files larger than this are not served.
const MAX_STATIC_BYTES: u64 = 8 * 1024 * 1024;

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) => match ext.as_str() {
            "html" | "htm" => "text/html; charset=utf-8",
            "js" | "mjs" => "application/javascript; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "json" => "application/json",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "webp" => "image/webp",
            "txt" => "text/plain; charset=utf-8",
            _ => "application/octet-stream",
        },
        None => "application/octet-stream",
    }
}

/// Serve `request_path` from `root`. `/app` and `/app/` map to `index.html`.
pub async fn serve(root: &Path, request_path: &str) -> Response {
    let mapped = match request_path {
        "/app" | "/app/" => "/index.html",
        other => other,
    };
    let path = match secure_static_path(root, mapped) {
        Ok(p) => p,
        Err(_) => return Response::error(404, "not_found", "not found"),
    };
    match fs::metadata(&path).await {
        Ok(meta) if meta.is_file() && meta.len() <= MAX_STATIC_BYTES => {}
        Ok(meta) if meta.is_file() => {
            log::warn!("static file {} too large to serve", path.display());
            return Response::error(404, "not_found", "not found");
        }
        _ => return Response::error(404, "not_found", "not found"),
    }
    match fs::read(&path).await {
        Ok(body) => Response::bytes(200, content_type(&path), body),
        Err(e) => {
            log::warn!("failed to read static file {}: {}", path.display(), e);
            Response::error(404, "not_found", "not found")
        }
    }
}
