pub mod auth;
pub mod client;
pub mod error;
pub mod storage;
pub mod transport;
pub mod upload;

pub use auth::{Credentials, SignType, Signer};

pub use client::{CosClient, CosConfig, LogLevel};

pub use error::{CosError, Result};

pub use storage::{
    count, create_folder, delete, exists, list, list_page, stat, ListOptions, ListOrder,
    ListPage, ListPattern, Resource, ResourceKind,
};

pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

#[cfg(feature = "tokio")]
pub use upload::upload_file_async;
pub use upload::{
    upload_file, upload_into_dir, UploadOptions, UploadProgress, UploadResult,
};
