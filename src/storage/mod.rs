//! Directory and file operations against a bucket
//!
//! Thin wrappers over the file API; every call is signed by the client.
//!
//! ## Core Functions
//!
//! - [`stat()`] - Metadata of a directory or file
//! - [`exists()`] - Whether a resource exists
//! - [`list()`] / [`list_page()`] - Directory listing
//! - [`count()`] - Number of entries in a directory
//! - [`create_folder()`] - Create a directory
//! - [`delete()`] - Delete a directory or file

pub mod crud;
pub mod types;

pub use crud::{count, create_folder, delete, exists, list, list_page, stat, CODE_NOT_FOUND};
pub use types::{
    normalize_dir, normalize_file, ListOptions, ListOrder, ListPage, ListPattern, Resource,
    ResourceKind,
};
