//! Blocking `reqwest` transport

use crate::error::Result;
use crate::transport::{FormValue, HttpRequest, HttpResponse, Method, RequestBody, Transport};
use log::debug;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("cos-client/", env!("CARGO_PKG_VERSION"));

/// Transport backed by a blocking `reqwest` client.
///
/// Must not be driven from inside an async runtime thread; the async
/// upload wrapper moves work onto `spawn_blocking` for that reason.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method, request.url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => {
                let mut form = Form::new();
                for part in parts {
                    form = match part.value {
                        FormValue::Text(text) => form.text(part.name, text),
                        FormValue::Bytes(bytes) => {
                            form.part(part.name, Part::bytes(bytes).file_name("blob"))
                        }
                    };
                }
                builder.multipart(form)
            }
        };

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();

        debug!("response status {} ({} bytes)", status, body.len());
        Ok(HttpResponse { status, body })
    }
}
