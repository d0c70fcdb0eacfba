//! The COS client: URL building, per-request signing and response decoding

use crate::auth::encoding::encode_path;
use crate::auth::signer::{Credentials, Signer};
use crate::client::config::CosConfig;
use crate::error::{CosError, Result};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody, Transport};
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Which resource signature authorizes a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignScope {
    /// Bucket-wide, time-bounded (list, stat, create, upload)
    Multiple,
    /// Single use on the target resource (delete)
    Once,
}

/// Envelope every file API response is wrapped in
#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Client for the COS file API.
///
/// Cheap to clone; clones share the transport and signer.
#[derive(Clone)]
pub struct CosClient {
    config: Arc<CosConfig>,
    signer: Arc<Signer>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for CosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosClient")
            .field("config", &self.config)
            .finish()
    }
}

impl CosClient {
    /// Create a client talking HTTP through `reqwest`
    pub fn new(config: CosConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(Duration::from_secs(config.timeout_secs))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(config: CosConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let credentials = Credentials::new(
            config.app_id.clone(),
            config.secret_id.clone(),
            config.secret_key.clone(),
        );
        let signer = Signer::new(credentials).default_ttl(config.multiple_sign_expire);

        Ok(Self {
            config: Arc::new(config),
            signer: Arc::new(signer),
            transport,
        })
    }

    /// Replace the signer, e.g. one with a fixed clock
    pub fn with_signer(mut self, signer: Signer) -> Self {
        self.signer = Arc::new(signer);
        self
    }

    pub fn config(&self) -> &CosConfig {
        &self.config
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// The given bucket, or the configured default
    pub fn resolve_bucket(&self, bucket: Option<&str>) -> Result<String> {
        bucket
            .map(str::to_string)
            .or_else(|| self.config.default_bucket.clone())
            .ok_or_else(|| {
                CosError::invalid_argument("bucket", "No bucket given and no default bucket configured")
            })
    }

    /// `{endpoint}/files/v1/{app_id}/{bucket}{path}` with the path percent-encoded
    pub fn resource_url(&self, bucket: &str, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!(
            "{}/files/v1/{}/{}{}",
            self.config.endpoint(),
            self.config.app_id,
            bucket,
            encode_path(&path)
        )
    }

    /// Signed GET with a query string; returns the `data` payload
    pub(crate) fn get(
        &self,
        bucket: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Value>> {
        let query = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}?{}", self.resource_url(bucket, path), query);

        let request = HttpRequest::new(Method::Get, url)
            .header("Authorization", self.authorize(bucket, path, SignScope::Multiple)?);
        self.execute(request)
    }

    /// Signed POST; returns the `data` payload
    pub(crate) fn post(
        &self,
        bucket: &str,
        path: &str,
        body: RequestBody,
        scope: SignScope,
    ) -> Result<Option<Value>> {
        let request = HttpRequest::new(Method::Post, self.resource_url(bucket, path))
            .header("Authorization", self.authorize(bucket, path, scope)?)
            .body(body);
        self.execute(request)
    }

    // A fresh token per request; tokens are never reused.
    fn authorize(&self, bucket: &str, path: &str, scope: SignScope) -> Result<String> {
        match scope {
            SignScope::Multiple => self.signer.multiple(bucket, None),
            SignScope::Once => Ok(self.signer.once(bucket, path)),
        }
    }

    fn execute(&self, request: HttpRequest) -> Result<Option<Value>> {
        debug!("{} {}", request.method, request.url);
        let response = self.transport.send(request)?;
        decode_response(response)
    }
}

/// Turn a raw response into its `data` payload or a `ServerError`
pub(crate) fn decode_response(response: HttpResponse) -> Result<Option<Value>> {
    let status = response.status;
    let parsed: std::result::Result<ApiResponse, _> = serde_json::from_slice(&response.body);

    match parsed {
        Ok(api) if response.is_success() && api.code == 0 => Ok(api.data),
        Ok(api) => Err(CosError::server_error(status, api.code, api.message)),
        Err(_) if !response.is_success() => Err(CosError::server_error(
            status,
            -1,
            String::from_utf8_lossy(&response.body).into_owned(),
        )),
        // a truncated or garbled 2xx is retried like any server failure
        Err(e) => Err(CosError::server_error(
            status,
            -1,
            format!("Malformed response body: {}", e),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CosClient {
        let config = CosConfig::new("100000", "secret_id", "secret_key").protocol("http");
        CosClient::new(config).unwrap()
    }

    #[test]
    fn test_resource_url() {
        let client = client();
        assert_eq!(
            client.resource_url("bucket_name", "/path/d1/"),
            "http://web.file.myqcloud.com/files/v1/100000/bucket_name/path/d1/"
        );
        assert_eq!(
            client.resource_url("bucket_name", "a b.txt"),
            "http://web.file.myqcloud.com/files/v1/100000/bucket_name/a%20b.txt"
        );
    }

    #[test]
    fn test_resolve_bucket() {
        let client = client();
        assert_eq!(client.resolve_bucket(Some("b")).unwrap(), "b");
        assert!(matches!(
            client.resolve_bucket(None),
            Err(CosError::InvalidArgument { .. })
        ));

        let config = CosConfig::new("1", "id", "key").default_bucket("fallback");
        let client = CosClient::new(config).unwrap();
        assert_eq!(client.resolve_bucket(None).unwrap(), "fallback");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            CosClient::new(CosConfig::new("", "id", "key")),
            Err(CosError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_decode_success() {
        let response = HttpResponse::new(200, r#"{"code":0,"message":"ok","data":{"filesize":5}}"#);
        let data = decode_response(response).unwrap().unwrap();
        assert_eq!(data["filesize"], 5);

        let response = HttpResponse::new(200, r#"{"code":0,"message":"ok"}"#);
        assert!(decode_response(response).unwrap().is_none());
    }

    #[test]
    fn test_decode_server_errors() {
        let response = HttpResponse::new(400, r#"{"code":-166,"message":"not found"}"#);
        match decode_response(response).unwrap_err() {
            CosError::ServerError { status, code, message } => {
                assert_eq!(status, 400);
                assert_eq!(code, -166);
                assert_eq!(message, "not found");
            }
            other => panic!("Expected ServerError, got {:?}", other),
        }

        // non-zero code on a 200
        let response = HttpResponse::new(200, r#"{"code":-5,"message":"bad"}"#);
        assert_eq!(decode_response(response).unwrap_err().server_code(), Some(-5));

        // undecodable error body
        let response = HttpResponse::new(502, "Bad Gateway");
        match decode_response(response).unwrap_err() {
            CosError::ServerError { status, code, message } => {
                assert_eq!((status, code), (502, -1));
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("Expected ServerError, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_garbage_success_is_retryable_server_error() {
        let response = HttpResponse::new(200, r#"{"code":0,"mess"#);
        let err = decode_response(response).unwrap_err();
        match &err {
            CosError::ServerError { status, code, message } => {
                assert_eq!((*status, *code), (200, -1));
                assert!(message.starts_with("Malformed response body"));
            }
            other => panic!("Expected ServerError, got {:?}", other),
        }
        assert!(err.is_retryable());
    }
}
