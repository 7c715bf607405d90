//! Extension-to-`Content-Type` lookup for response headers.

/// Best-guess MIME type for an object key's extension, or `None` when the
/// extension is unrecognized (the handler then omits `Content-Type`).
pub fn lookup(object_key: &str) -> Option<String> {
    let guess = mime_guess::from_path(object_key).first();
    guess.map(|m| m.essence_str().to_string())
}
