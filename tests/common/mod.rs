//! Shared fixtures: a scripted in-memory transport and a fake file service

#![allow(dead_code)]

use cos_client::transport::{HttpRequest, HttpResponse, RequestBody, Transport};
use cos_client::{CosClient, CosConfig, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const BUCKET: &str = "bucket_name";

type Handler = Box<dyn FnMut(&HttpRequest) -> Result<HttpResponse> + Send>;

/// Records every request and answers with a scripted handler
pub struct MockTransport {
    requests: Mutex<Vec<HttpRequest>>,
    handler: Mutex<Handler>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: FnMut(&HttpRequest) -> Result<HttpResponse> + Send + 'static,
    {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            handler: Mutex::new(Box::new(handler)),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose operation is `op` (`upload`, `init`, `chunk`, `stat`, ...)
    pub fn requests_for(&self, op: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| op_of(request) == op)
            .collect()
    }

    pub fn clear(&self) {
        self.requests.lock().unwrap().clear();
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let mut handler = self.handler.lock().unwrap();
        (&mut *handler)(&request)
    }
}

/// Operation of a request; sliced uploads are split into `init` and `chunk`
pub fn op_of(request: &HttpRequest) -> String {
    match &request.body {
        RequestBody::Multipart(_) => match request.body.form_text("op") {
            Some("upload_slice") if request.body.form_text("session").is_some() => {
                "chunk".to_string()
            }
            Some("upload_slice") => "init".to_string(),
            Some(op) => op.to_string(),
            None => String::new(),
        },
        RequestBody::Json(value) => value["op"].as_str().unwrap_or_default().to_string(),
        RequestBody::Empty => request
            .url
            .split_once('?')
            .and_then(|(_, query)| {
                query
                    .split('&')
                    .find_map(|pair| pair.strip_prefix("op="))
                    .map(str::to_string)
            })
            .unwrap_or_default(),
    }
}

pub fn chunk_offset(request: &HttpRequest) -> Option<u64> {
    request
        .body
        .form_text("offset")
        .and_then(|offset| offset.parse().ok())
}

pub fn chunk_len(request: &HttpRequest) -> usize {
    request
        .body
        .form_bytes("filecontent")
        .map(<[u8]>::len)
        .unwrap_or(0)
}

pub fn ok(data: Value) -> Result<HttpResponse> {
    Ok(HttpResponse::new(
        200,
        json!({"code": 0, "message": "SUCCESS", "data": data}).to_string(),
    ))
}

pub fn failure(status: u16, code: i64, message: &str) -> Result<HttpResponse> {
    Ok(HttpResponse::new(
        status,
        json!({"code": code, "message": message}).to_string(),
    ))
}

/// A well-behaved file service that dictates `slice_size` for sliced uploads.
///
/// `stat` reports the size announced at session start, or the end of the
/// furthest slice received when no session was opened through it.
pub fn fake_cos(slice_size: u64) -> impl FnMut(&HttpRequest) -> Result<HttpResponse> + Send {
    let mut size = 0u64;

    move |request: &HttpRequest| match op_of(request).as_str() {
        "upload" => ok(json!({"access_url": "http://cdn.example.com/whole"})),
        "init" => {
            size = request
                .body
                .form_text("filesize")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            ok(json!({"session": "session-1", "slice_size": slice_size, "offset": 0}))
        }
        "chunk" => {
            let end = chunk_offset(request).unwrap_or(0) + chunk_len(request) as u64;
            size = size.max(end);
            ok(json!({"access_url": "http://cdn.example.com/sliced"}))
        }
        "stat" => ok(json!({"name": "f", "filesize": size, "filelen": size, "ctime": "1", "mtime": "2"})),
        "create" | "delete" => ok(json!({})),
        other => failure(400, -1, &format!("unexpected op {}", other)),
    }
}

pub fn client(transport: Arc<MockTransport>) -> CosClient {
    let config = CosConfig::new("100000", "secret_id", "secret_key");
    CosClient::with_transport(config, transport).unwrap()
}

/// Write `len` bytes of a repeating pattern
pub fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    let content: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, content).unwrap();
    path
}
