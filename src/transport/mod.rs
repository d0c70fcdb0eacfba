//! HTTP transport used by the client
//!
//! The client only needs a status code and a body back from each exchange,
//! so the transport is a narrow trait. `HttpTransport` is the production
//! implementation; tests plug in scripted transports.

pub mod http;

pub use http::HttpTransport;

use crate::error::Result;
use std::fmt;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Value of a multipart form field
#[derive(Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl fmt::Debug for FormValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormValue::Text(text) => write!(f, "Text({:?})", text),
            FormValue::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

/// One multipart form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn bytes(name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Bytes(value),
        }
    }
}

/// Request body
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    /// Look up a text field of a multipart body
    pub fn form_text(&self, name: &str) -> Option<&str> {
        match self {
            RequestBody::Multipart(parts) => parts.iter().find_map(|part| match &part.value {
                FormValue::Text(text) if part.name == name => Some(text.as_str()),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Look up a binary field of a multipart body
    pub fn form_bytes(&self, name: &str) -> Option<&[u8]> {
        match self {
            RequestBody::Multipart(parts) => parts.iter().find_map(|part| match &part.value {
                FormValue::Bytes(bytes) if part.name == name => Some(bytes.as_slice()),
                _ => None,
            }),
            _ => None,
        }
    }
}

/// An outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// First header value with the given name (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status code and raw body of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one HTTP exchange.
///
/// Implementations return `CosError::TransportError` for network-level
/// failures and hand any received status back unchanged.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
