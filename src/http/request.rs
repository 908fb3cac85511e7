use std::collections::HashMap;

/// HTTP request methods.
///
/// Only the two methods the resource allow-list can be reached with are
/// accepted; anything else fails request-line parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    Get,
    /// POST - Submit form data
    Post,
}

impl Method {
    /// Parses an HTTP method token (case-sensitive, as on the wire).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            _ => None,
        }
    }
}

/// Progress of the incremental parser over one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    RequestLine,
    Headers,
    Body,
    Finished,
}

/// A parsed (or partially parsed) HTTP request.
///
/// Filled in incrementally by [`crate::http::parser::parse`] as bytes arrive.
/// Once the state reaches [`ParseState::Finished`] the structured fields are
/// stable until [`Request::reset`] starts the next keep-alive request.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Option<Method>,
    pub(crate) path: String,
    pub(crate) version: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) body: String,
    pub(crate) state: ParseState,
}

impl Request {
    pub fn new() -> Self {
        Self {
            method: None,
            path: String::new(),
            version: String::new(),
            headers: HashMap::new(),
            body: String::new(),
            state: ParseState::RequestLine,
        }
    }

    /// Clears every field for the next request on the same connection.
    pub fn reset(&mut self) {
        self.method = None;
        self.path.clear();
        self.version.clear();
        self.headers.clear();
        self.body.clear();
        self.state = ParseState::RequestLine;
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// The effective resource path (normalized, possibly rewritten by the
    /// form-POST rule).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_finished(&self) -> bool {
        self.state == ParseState::Finished
    }

    /// Whether the client asked to reuse the connection: the `Connection`
    /// header must be exactly `keep-alive` and the version `1.1`.
    pub fn keep_alive(&self) -> bool {
        self.header("Connection") == Some("keep-alive") && self.version == "1.1"
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}
