//! MIME type detection based on file extensions.

/// Maps a path's suffix to a `Content-Type`. Unknown or missing suffixes
/// default to plain text.
pub fn content_type(path: &str) -> &'static str {
    let Some((_, suffix)) = path.rsplit_once('.') else {
        return "text/plain";
    };
    match suffix {
        "html" => "text/html",
        "xml" => "text/xml",
        "xhtml" => "application/xhtml+xml",
        "txt" => "text/plain",
        "rtf" => "application/rtf",
        "pdf" => "application/pdf",
        "word" => "application/nsword",
        "png" => "image/png",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "au" => "audio/basic",
        "mpeg" | "mpg" => "video/mpeg",
        "avi" => "video/x-msvideo",
        "gz" => "application/x-gzip",
        "tar" => "application/x-tar",
        "css" => "text/css",
        "js" => "text/javascript",
        _ => "text/plain",
    }
}
