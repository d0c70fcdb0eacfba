//! Request authentication for COS
//!
//! Two schemes are supported: per-request HMAC authorization headers
//! (`Signer::authorization`) and bucket/resource scoped signatures
//! (`Signer::once`, `Signer::multiple`) used by the file API.

pub mod clock;
pub mod encoding;
pub mod signer;

pub use clock::{Clock, FixedClock, FixedNonce, NonceSource, RandomNonce, SystemClock};
pub use signer::{Credentials, SignType, Signer, DEFAULT_MULTIPLE_SIGN_EXPIRE, KEY_TIME_SECONDS};
