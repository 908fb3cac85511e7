use hearth::buffer::Buffer;
use hearth::http::parser::{ParseError, parse};
use hearth::http::request::{Method, Request};

fn buffer_of(bytes: &[u8]) -> Buffer {
    let mut buf = Buffer::new();
    buf.append(bytes);
    buf
}

#[test]
fn test_parse_get_index_keep_alive() {
    let mut buf = buffer_of(b"GET /index HTTP/1.1\r\nConnection: keep-alive\r\n\r\n");
    let mut req = Request::new();

    parse(&mut req, &mut buf).unwrap();

    assert!(req.is_finished());
    assert_eq!(req.method(), Some(Method::Get));
    assert_eq!(req.path(), "/index.html");
    assert_eq!(req.version(), "1.1");
    assert!(req.keep_alive());
}

#[test]
fn test_parse_root_maps_to_index() {
    let mut buf = buffer_of(b"GET / HTTP/1.1\r\n\r\n");
    let mut req = Request::new();

    parse(&mut req, &mut buf).unwrap();

    assert_eq!(req.path(), "/index.html");
}

#[test]
fn test_parse_unknown_path_is_rejected() {
    let mut buf = buffer_of(b"GET /doesnotexist HTTP/1.1\r\n\r\n");
    let mut req = Request::new();

    let result = parse(&mut req, &mut buf);

    assert_eq!(result, Err(ParseError::PathNotAllowed));
}

#[test]
fn test_parse_unknown_method_is_rejected() {
    let mut buf = buffer_of(b"BREW /index HTTP/1.1\r\n\r\n");
    let mut req = Request::new();

    assert_eq!(parse(&mut req, &mut buf), Err(ParseError::UnknownMethod));
}

#[test]
fn test_parse_malformed_request_line() {
    let mut buf = buffer_of(b"GET /index\r\n\r\n");
    let mut req = Request::new();

    assert_eq!(parse(&mut req, &mut buf), Err(ParseError::BadRequestLine));
}

#[test]
fn test_parse_post_login_lands_on_welcome() {
    let mut buf = buffer_of(
        b"POST /login HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 0\r\n\r\nuser=a&pass=b",
    );
    let mut req = Request::new();

    parse(&mut req, &mut buf).unwrap();

    assert!(req.is_finished());
    assert_eq!(req.path(), "/welcome.html");
    assert_eq!(req.body(), "user=a&pass=b");
}

#[test]
fn test_post_without_form_content_type_keeps_path() {
    let mut buf = buffer_of(b"POST /login HTTP/1.1\r\nContent-Type: text/plain\r\n\r\nhello");
    let mut req = Request::new();

    parse(&mut req, &mut buf).unwrap();

    assert_eq!(req.path(), "/login.html");
    assert_eq!(req.body(), "hello");
}

#[test]
fn test_duplicate_header_last_wins() {
    let mut buf = buffer_of(b"GET /index HTTP/1.1\r\nHost: first\r\nHost: second\r\n\r\n");
    let mut req = Request::new();

    parse(&mut req, &mut buf).unwrap();

    assert_eq!(req.header("Host"), Some("second"));
}

#[test]
fn test_header_value_space_is_optional() {
    let mut buf = buffer_of(b"GET /index HTTP/1.1\r\nHost:example.com\r\nAgent: curl\r\n\r\n");
    let mut req = Request::new();

    parse(&mut req, &mut buf).unwrap();

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("Agent"), Some("curl"));
}

#[test]
fn test_keep_alive_requires_http_1_1() {
    let mut buf = buffer_of(b"GET /index HTTP/1.0\r\nConnection: keep-alive\r\n\r\n");
    let mut req = Request::new();

    parse(&mut req, &mut buf).unwrap();

    assert!(!req.keep_alive());
}

#[test]
fn test_keep_alive_value_is_case_exact() {
    let mut buf = buffer_of(b"GET /index HTTP/1.1\r\nConnection: Keep-Alive\r\n\r\n");
    let mut req = Request::new();

    parse(&mut req, &mut buf).unwrap();

    assert!(!req.keep_alive());
}

#[test]
fn test_partial_line_stays_buffered() {
    let mut buf = buffer_of(b"GET /index HT");
    let mut req = Request::new();

    parse(&mut req, &mut buf).unwrap();
    assert!(!req.is_finished());
    // Nothing consumed: the request line's terminator has not arrived.
    assert_eq!(buf.readable_bytes(), 13);

    buf.append(b"TP/1.1\r\n\r\n");
    parse(&mut req, &mut buf).unwrap();

    assert!(req.is_finished());
    assert_eq!(req.path(), "/index.html");
}

#[test]
fn test_headers_split_across_reads() {
    let mut buf = buffer_of(b"GET /index HTTP/1.1\r\nConnection: keep");
    let mut req = Request::new();

    parse(&mut req, &mut buf).unwrap();
    assert!(!req.is_finished());

    buf.append(b"-alive\r\n\r\n");
    parse(&mut req, &mut buf).unwrap();

    assert!(req.is_finished());
    assert!(req.keep_alive());
}

#[test]
fn test_reset_clears_previous_request() {
    let mut buf = buffer_of(b"GET /index HTTP/1.1\r\nHost: a\r\n\r\n");
    let mut req = Request::new();
    parse(&mut req, &mut buf).unwrap();

    req.reset();

    assert!(!req.is_finished());
    assert_eq!(req.path(), "");
    assert_eq!(req.header("Host"), None);
}
