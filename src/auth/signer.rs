//! Signature generation for COS requests

use crate::auth::clock::{Clock, NonceSource, RandomNonce, SystemClock};
use crate::auth::encoding::{encode_path, form_encode};
use crate::error::{CosError, Result};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use std::fmt;
use std::sync::Arc;

type HmacSha1 = Hmac<Sha1>;

/// Lifetime of the ephemeral key behind an `authorization` header (30 minutes)
pub const KEY_TIME_SECONDS: i64 = 60 * 30;

/// Default lifetime of a `multiple` signature, in seconds
pub const DEFAULT_MULTIPLE_SIGN_EXPIRE: i64 = 600;

/// Account credentials, immutable once built
#[derive(Clone)]
pub struct Credentials {
    app_id: String,
    secret_id: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(
        app_id: impl Into<String>,
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Scope of a resource signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignType {
    /// Single use against one resource (`e=0`)
    Once { file_id: String },
    /// Reusable on the whole bucket until `t + ttl`
    Multiple { ttl: i64 },
}

/// Produces request authorization headers and resource signatures.
///
/// A `Signer` holds only read-only state and can be shared between threads.
/// Every call reads the clock again; nothing is cached between requests.
#[derive(Clone)]
pub struct Signer {
    credentials: Credentials,
    default_ttl: i64,
    clock: Arc<dyn Clock>,
    nonce: Arc<dyn NonceSource>,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("credentials", &self.credentials)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl Signer {
    /// Create a signer using the wall clock and a random nonce
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            default_ttl: DEFAULT_MULTIPLE_SIGN_EXPIRE,
            clock: Arc::new(SystemClock),
            nonce: Arc::new(RandomNonce),
        }
    }

    /// Set the ttl used by `multiple` when the caller passes `None`
    pub fn default_ttl(mut self, ttl: i64) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Replace the time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the nonce source
    pub fn nonce_source(mut self, nonce: Arc<dyn NonceSource>) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign one HTTP request.
    ///
    /// `headers` is augmented in place with `date` and `authorization`. The
    /// `q-header-list` covers the keys present before this call.
    pub fn authorization(
        &self,
        method: &str,
        uri: &str,
        parameters: &[(String, String)],
        headers: &mut Vec<(String, String)>,
    ) {
        let now = self.clock.now();
        let start = now.timestamp();
        let expire = start + KEY_TIME_SECONDS;
        let key_time = format!("{};{}", start, expire);

        let sign_key = hmac_sha1_hex(self.credentials.secret_key.as_bytes(), &key_time);

        let uri = if uri.is_empty() { "/" } else { uri };
        let http_string = format!(
            "{}\n{}\n{}\n{}\n",
            method,
            uri,
            form_encode(parameters),
            form_encode(headers)
        );
        let body_hash = hex::encode(Sha1::digest(http_string.as_bytes()));
        let string_to_sign = format!("sha1\n{}\n{}\n", key_time, body_hash);
        let signature = hmac_sha1_hex(sign_key.as_bytes(), &string_to_sign);

        let header_list = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let authorization = format!(
            "q-sign-algorithm=sha1&q-ak={}&q-sign-time={}&q-key-time={}&q-header-list={}&q-url-param-list=&q-signature={}",
            self.credentials.secret_id, key_time, key_time, header_list, signature
        );

        headers.push((
            "date".to_string(),
            now.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        ));
        headers.push(("authorization".to_string(), authorization));
    }

    /// Single-use signature for one resource (delete, update)
    pub fn once(&self, bucket: &str, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        let file_id = format!("/{}/{}{}", self.credentials.app_id, bucket, path);

        self.sign(&SignType::Once { file_id }, bucket)
    }

    /// Reusable signature for the bucket, valid for `ttl` seconds
    /// (the signer's default when `None`)
    pub fn multiple(&self, bucket: &str, ttl: Option<i64>) -> Result<String> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl <= 0 {
            return Err(CosError::invalid_argument(
                "ttl",
                "Multiple signature expire seconds must be greater than 0",
            ));
        }

        Ok(self.sign(&SignType::Multiple { ttl }, bucket))
    }

    fn sign(&self, sign_type: &SignType, bucket: &str) -> String {
        let sign_string = self.string_to_sign(sign_type, bucket);

        let mut mac = HmacSha1::new_from_slice(self.credentials.secret_key.as_bytes())
            .expect("HMAC accepts any key size");
        mac.update(sign_string.as_bytes());

        let mut token = mac.finalize().into_bytes().to_vec();
        token.extend_from_slice(sign_string.as_bytes());

        base64::engine::general_purpose::STANDARD.encode(token)
    }

    fn string_to_sign(&self, sign_type: &SignType, bucket: &str) -> String {
        let r = self.nonce.nonce();
        let t = self.clock.now().timestamp();

        let (e, f) = match sign_type {
            SignType::Once { file_id } => (0, encode_path(file_id)),
            SignType::Multiple { ttl } => (t + ttl, String::new()),
        };

        format!(
            "a={}&b={}&k={}&e={}&t={}&r={}&f={}",
            self.credentials.app_id, bucket, self.credentials.secret_id, e, t, r, f
        )
    }
}

fn hmac_sha1_hex(key: &[u8], data: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts any key size");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::{FixedClock, FixedNonce};

    fn signer() -> Signer {
        Signer::new(Credentials::new("100000", "secret_id", "secret_key"))
            .clock(Arc::new(FixedClock::at_unix(1_500_000_000)))
            .nonce_source(Arc::new(FixedNonce(12345)))
    }

    fn decode(token: &str) -> (Vec<u8>, String) {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(token)
            .unwrap();
        let (digest, rest) = raw.split_at(20);
        (digest.to_vec(), String::from_utf8(rest.to_vec()).unwrap())
    }

    #[test]
    fn test_once_string_to_sign() {
        let (_, plain) = decode(&signer().once("bucket_name", "/path/f1"));
        assert_eq!(
            plain,
            "a=100000&b=bucket_name&k=secret_id&e=0&t=1500000000&r=12345&f=/100000/bucket_name/path/f1"
        );
    }

    #[test]
    fn test_once_escapes_everything_but_slash() {
        let (_, plain) = decode(&signer().once("bucket_name", "/dir one/a&b.txt"));
        assert!(plain.ends_with("&f=/100000/bucket_name/dir%20one/a%26b.txt"));
    }

    #[test]
    fn test_once_known_token() {
        assert_eq!(
            signer().once("bucket_name", "/path/f1"),
            "nK6wAPcqSXsOCt6NcOSPk8Vl46lhPTEwMDAwMCZiPWJ1Y2tldF9uYW1lJms9c2VjcmV0X2lkJmU9MCZ0PTE1MDAwMDAwMDAmcj0xMjM0NSZmPS8xMDAwMDAvYnVja2V0X25hbWUvcGF0aC9mMQ=="
        );
    }

    #[test]
    fn test_multiple_string_to_sign() {
        let token = signer().multiple("bucket_name", Some(600)).unwrap();
        let (digest, plain) = decode(&token);
        assert_eq!(
            plain,
            "a=100000&b=bucket_name&k=secret_id&e=1500000600&t=1500000000&r=12345&f="
        );

        let mut mac = HmacSha1::new_from_slice(b"secret_key").unwrap();
        mac.update(plain.as_bytes());
        assert_eq!(digest, mac.finalize().into_bytes().to_vec());
    }

    #[test]
    fn test_multiple_uses_default_ttl() {
        let token = signer().default_ttl(30).multiple("b", None).unwrap();
        let (_, plain) = decode(&token);
        assert!(plain.contains("&e=1500000030&"));
    }

    #[test]
    fn test_multiple_rejects_non_positive_ttl() {
        for ttl in [0, -1] {
            match signer().multiple("b", Some(ttl)).unwrap_err() {
                CosError::InvalidArgument { parameter, .. } => assert_eq!(parameter, "ttl"),
                other => panic!("Expected InvalidArgument, got {:?}", other),
            }
        }
        assert!(signer().default_ttl(0).multiple("b", None).is_err());
    }

    #[test]
    fn test_authorization_known_signature() {
        let mut headers = vec![("host".to_string(), "example.com".to_string())];
        signer().authorization("get", "/path/f1", &[], &mut headers);

        assert_eq!(headers.len(), 3);
        assert_eq!(headers[1], ("date".to_string(), "Fri, 14 Jul 2017 02:40:00 GMT".to_string()));
        assert_eq!(
            headers[2].1,
            "q-sign-algorithm=sha1&q-ak=secret_id&q-sign-time=1500000000;1500001800&q-key-time=1500000000;1500001800&q-header-list=host&q-url-param-list=&q-signature=555a449fcdd8626b60a8502791ec1328a92c0414"
        );
    }

    #[test]
    fn test_authorization_empty_uri_defaults_to_root() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        signer().authorization("get", "", &[], &mut a);
        signer().authorization("get", "/", &[], &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let debug = format!("{:?}", Credentials::new("1", "id", "very-secret"));
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
