use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::buffer::Buffer;
use crate::http::mime;

/// Standard reason phrase for the status codes the server can produce.
fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Bad Request",
    }
}

/// Fixed error page served for each known error status.
fn error_page(code: u16) -> Option<&'static str> {
    match code {
        400 => Some("/400.html"),
        403 => Some("/403.html"),
        404 => Some("/404.html"),
        _ => None,
    }
}

/// Builds one HTTP response: status line, headers, and a body served from a
/// memory-mapped file.
///
/// The response owns at most one live file mapping. [`Response::init`] on a
/// response that still holds a mapping releases it first, and dropping the
/// response releases it unconditionally, so a keep-alive connection can reuse
/// one `Response` across requests without leaking mappings. The mapped bytes
/// are only ever exposed as a borrowed slice.
#[derive(Debug)]
pub struct Response {
    code: Option<u16>,
    keep_alive: bool,
    path: String,
    root: PathBuf,
    file: Option<Mmap>,
    /// Emit `Connection: keep-alive` for eligible requests instead of the
    /// default unconditional `close`.
    keep_alive_responses: bool,
}

impl Response {
    pub fn new(root: PathBuf, keep_alive_responses: bool) -> Self {
        Self {
            code: None,
            keep_alive: false,
            path: String::new(),
            root,
            file: None,
            keep_alive_responses,
        }
    }

    /// Prepares the response for a new request. `code` of `None` means the
    /// status is still undecided and will be resolved by [`Response::build`]
    /// from the file's stat result.
    pub fn init(&mut self, path: String, keep_alive: bool, code: Option<u16>) {
        self.file = None;
        self.code = code;
        self.keep_alive = keep_alive;
        self.path = path;
    }

    /// Resolves the status, then appends the status line and headers to `buf`
    /// and maps the served file (or synthesizes an error body into `buf`).
    pub fn build(&mut self, buf: &mut Buffer) {
        let code = match self.code {
            // A pre-decided status (the 400 track) stands.
            Some(code) => code,
            None => match fs::metadata(self.resolved_path()) {
                Err(_) => 404,
                Ok(meta) if meta.is_dir() => 404,
                Ok(meta) if meta.permissions().mode() & 0o004 == 0 => 403,
                Ok(_) => 200,
            },
        };
        self.code = Some(code);

        if let Some(page) = error_page(code) {
            self.path = page.to_string();
        }

        self.append_status_line(buf, code);
        self.append_headers(buf);
        self.append_content(buf, code);
    }

    /// The mapped file bytes, if the body is file-backed.
    pub fn file(&self) -> Option<&[u8]> {
        self.file.as_deref()
    }

    pub fn file_len(&self) -> usize {
        self.file.as_ref().map(|map| map.len()).unwrap_or(0)
    }

    pub fn code(&self) -> Option<u16> {
        self.code
    }

    /// Whether the connection should stay open once this response is written.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Releases the file mapping, if any.
    pub fn unmap(&mut self) {
        self.file = None;
    }

    fn resolved_path(&self) -> PathBuf {
        self.root.join(self.path.trim_start_matches('/'))
    }

    fn append_status_line(&self, buf: &mut Buffer, code: u16) {
        buf.append(format!("HTTP/1.1 {} {}\r\n", code, reason(code)).as_bytes());
    }

    fn append_headers(&self, buf: &mut Buffer) {
        buf.append(b"Connection: ");
        if self.keep_alive_responses && self.keep_alive {
            buf.append(b"keep-alive\r\n");
            buf.append(b"Keep-Alive: max=6, timeout=120\r\n");
        } else {
            buf.append(b"close\r\n");
        }
        buf.append(format!("Content-Type: {}\r\n", mime::content_type(&self.path)).as_bytes());
    }

    fn append_content(&mut self, buf: &mut Buffer, code: u16) {
        let full = self.resolved_path();
        let file = match File::open(&full) {
            Ok(file) => file,
            Err(err) => {
                debug!("open {} failed: {}", full.display(), err);
                self.append_error_body(buf, code, "File Not Found!");
                return;
            }
        };

        // Read-only copy-on-write mapping; the descriptor is closed as soon
        // as `file` leaves scope, the mapping outlives it.
        let map = match unsafe { MmapOptions::new().map_copy_read_only(&file) } {
            Ok(map) => map,
            Err(err) => {
                debug!("mmap {} failed: {}", full.display(), err);
                self.append_error_body(buf, code, "File Not Found!");
                return;
            }
        };

        buf.append(format!("Content-Length: {}\r\n\r\n", map.len()).as_bytes());
        self.file = Some(map);
    }

    /// Synthesized HTML body used when the target file cannot be served.
    fn append_error_body(&self, buf: &mut Buffer, code: u16, message: &str) {
        let mut body = String::from("<html><title>Error</title>");
        body.push_str("<body bgcolor=\"ffffff\">");
        body.push_str(&format!("{} : {}\n", code, reason(code)));
        body.push_str(&format!("<p>{}</p>", message));
        body.push_str("<hr><em>hearth</em></body></html>");

        buf.append(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
        buf.append(body.as_bytes());
    }
}
