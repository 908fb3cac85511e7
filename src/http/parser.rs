use crate::buffer::Buffer;
use crate::http::request::{Method, ParseState, Request};

/// Resources a request line may name. Everything else is a bad request;
/// this is a closed allow-list, not general path routing.
const ALLOWED_PATHS: [&str; 6] = [
    "/index",
    "/register",
    "/login",
    "/welcome",
    "/video",
    "/picture",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    BadRequestLine,
    UnknownMethod,
    PathNotAllowed,
}

/// Advances the request's state machine over the buffer's readable bytes,
/// one CRLF-terminated line at a time.
///
/// A line whose terminator has not arrived yet stays buffered for the next
/// read, leaving the state short of `Finished`. Only a malformed request line
/// fails; header and body handling never do.
pub fn parse(req: &mut Request, buf: &mut Buffer) -> Result<(), ParseError> {
    while buf.readable_bytes() > 0 && req.state != ParseState::Finished {
        match req.state {
            ParseState::RequestLine | ParseState::Headers => {
                let Some(line_len) = find_crlf(buf.peek()) else {
                    break;
                };
                let line = String::from_utf8_lossy(&buf.peek()[..line_len]).into_owned();
                let remaining_after = buf.readable_bytes() - line_len - 2;

                if req.state == ParseState::RequestLine {
                    parse_request_line(req, &line)?;
                } else {
                    parse_header(req, &line);
                    if line_len == 0 && remaining_after == 0 {
                        // Empty boundary line with nothing behind it: no body.
                        req.state = ParseState::Finished;
                    }
                }
                buf.advance(line_len + 2);
            }
            ParseState::Body => {
                let (line_len, consumed) = match find_crlf(buf.peek()) {
                    Some(len) => (len, len + 2),
                    None => (buf.readable_bytes(), buf.readable_bytes()),
                };
                let line = String::from_utf8_lossy(&buf.peek()[..line_len]).into_owned();
                parse_body(req, line);
                buf.advance(consumed);
            }
            ParseState::Finished => {}
        }
    }
    Ok(())
}

/// Offset of the first CRLF in `bytes`, i.e. the length of the first line.
fn find_crlf(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|w| w == b"\r\n")
}

/// Matches `METHOD SP PATH SP HTTP/VERSION` and normalizes the path.
fn parse_request_line(req: &mut Request, line: &str) -> Result<(), ParseError> {
    let mut tokens = line.split(' ');
    let (Some(method), Some(path), Some(version), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(ParseError::BadRequestLine);
    };
    let version = version
        .strip_prefix("HTTP/")
        .ok_or(ParseError::BadRequestLine)?;

    req.method = Some(Method::from_token(method).ok_or(ParseError::UnknownMethod)?);
    req.path = path.to_string();
    req.version = version.to_string();

    if req.path == "/" {
        req.path = "/index.html".to_string();
    } else if ALLOWED_PATHS.contains(&req.path.as_str()) {
        req.path.push_str(".html");
    } else {
        return Err(ParseError::PathNotAllowed);
    }

    req.state = ParseState::Headers;
    Ok(())
}

/// Inserts a `KEY: VALUE` line into the header map (last occurrence of a
/// duplicate key wins). A line that is not a header marks the header/body
/// boundary.
fn parse_header(req: &mut Request, line: &str) {
    match line.split_once(':') {
        Some((key, value)) => {
            let value = value.strip_prefix(' ').unwrap_or(value);
            req.headers.insert(key.to_string(), value.to_string());
        }
        None => req.state = ParseState::Body,
    }
}

/// The remaining line is the whole body. A form-encoded POST skips field
/// validation entirely and lands on the welcome page.
fn parse_body(req: &mut Request, line: String) {
    req.body = line;
    if req.method == Some(Method::Post)
        && req.header("Content-Type") == Some("application/x-www-form-urlencoded")
    {
        req.path = "/welcome.html".to_string();
    }
    req.state = ParseState::Finished;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let mut buf = Buffer::new();
        buf.append(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");
        let mut req = Request::new();

        parse(&mut req, &mut buf).unwrap();

        assert!(req.is_finished());
        assert_eq!(req.path(), "/index.html");
        assert_eq!(req.header("Host"), Some("example.com"));
    }
}
