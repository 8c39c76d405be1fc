//! # Tipos MIME
//! src/http/mime.rs
//!
//! Deriva el `Content-Type` de un archivo a partir de su extensión.
//! La comparación ignora mayúsculas; extensiones desconocidas (o archivos
//! sin extensión) se sirven como `application/octet-stream`.

use std::path::Path;

/// Content-Type por defecto para extensiones desconocidas
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Tipo MIME para una extensión (sin el punto inicial)
///
/// # Ejemplo
/// ```
/// use tinyweb::http::mime;
/// assert_eq!(mime::from_extension("JSON"), "application/json");
/// assert_eq!(mime::from_extension("bin"), "application/octet-stream");
/// ```
pub fn from_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        _ => DEFAULT_MIME,
    }
}

/// Tipo MIME para una ruta del sistema de archivos
pub fn from_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(from_extension)
        .unwrap_or(DEFAULT_MIME)
}
