use derive_more::Display;

/// A HTTP method used by value transfers.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum HttpMethod {
    /// `GET`.
    #[display("GET")]
    Get,
    /// `PUT`.
    #[display("PUT")]
    Put,
    /// `POST`.
    #[display("POST")]
    Post,
}

/// A HTTP request, owned by a single transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    url: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl HttpRequest {
    /// Create a new request without headers or body.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append headers.
    #[must_use]
    pub fn with_headers<'a>(mut self, headers: impl IntoIterator<Item = &'a (String, String)>) -> Self {
        self.headers.extend(headers.into_iter().cloned());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Return the method.
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Return the URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Return the headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Return the value of the first header named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Return the body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// A HTTP response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    body: Vec<u8>,
}

impl HttpResponse {
    /// Create a new response.
    #[must_use]
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Return the status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Return the body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Convert into the body.
    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Identifies a request added to a [`Multiplexer`](super::Multiplexer).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, PartialOrd, Ord)]
#[display("#{_0}")]
pub struct TransferHandle(u64);

impl TransferHandle {
    /// Create a new transfer handle.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Return the id of the handle.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}
