//! Types for storage operations

use crate::error::{CosError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Whether a resource is a directory or a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Dir,
    File,
}

/// The service sends timestamps and sizes either as numbers or as strings
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    Text(String),
}

fn de_opt_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) if s.is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn de_opt_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match de_opt_i64(deserializer)? {
        None => Ok(None),
        Some(n) => u64::try_from(n).map(Some).map_err(serde::de::Error::custom),
    }
}

/// Resource entry as it appears on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawResource {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub ctime: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub mtime: Option<i64>,
    #[serde(default)]
    pub biz_attr: String,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub filesize: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub filelen: Option<u64>,
    #[serde(default)]
    pub access_url: Option<String>,
}

/// A directory or file in a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    /// Last path component (without trailing `/` for directories)
    pub name: String,
    /// Full path inside the bucket; directories end with `/`
    pub path: String,
    pub kind: ResourceKind,
    /// Creation time, unix seconds
    pub ctime: Option<i64>,
    /// Modification time, unix seconds
    pub mtime: Option<i64>,
    pub biz_attr: String,
    /// Declared file size (files only)
    pub filesize: Option<u64>,
    /// Bytes actually stored so far (files only)
    pub filelen: Option<u64>,
    pub access_url: Option<String>,
}

impl Resource {
    /// Build a resource from a listing entry found under `parent`
    pub(crate) fn from_listing(parent: &str, raw: RawResource) -> Self {
        let kind = if raw.filesize.is_some() {
            ResourceKind::File
        } else {
            ResourceKind::Dir
        };
        let name = raw.name.trim_end_matches('/').to_string();
        let path = match kind {
            ResourceKind::Dir => format!("{}{}/", normalize_dir(parent), name),
            ResourceKind::File => format!("{}{}", normalize_dir(parent), name),
        };
        Self::with_path(path, kind, raw)
    }

    /// Build a resource from a `stat` payload for `path`
    pub(crate) fn from_stat(path: &str, raw: RawResource) -> Self {
        let kind = if path.ends_with('/') && raw.filesize.is_none() {
            ResourceKind::Dir
        } else {
            ResourceKind::File
        };
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self::with_path(path, kind, raw)
    }

    fn with_path(path: String, kind: ResourceKind, raw: RawResource) -> Self {
        let name = if raw.name.is_empty() {
            path.trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string()
        } else {
            raw.name.trim_end_matches('/').to_string()
        };

        Self {
            name,
            path,
            kind,
            ctime: raw.ctime,
            mtime: raw.mtime,
            biz_attr: raw.biz_attr,
            filesize: raw.filesize,
            filelen: raw.filelen,
            access_url: raw.access_url,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ResourceKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == ResourceKind::File
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.ctime.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.mtime.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    /// A file is complete once every declared byte is stored
    pub fn is_complete(&self) -> bool {
        match (self.filesize, self.filelen) {
            (Some(size), Some(len)) => size == len,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Path of an entry named `name` inside this directory
    pub fn child_path(&self, name: &str) -> Result<String> {
        if !self.is_dir() {
            return Err(CosError::invalid_argument(
                "resource",
                format!("{} is not a directory", self.path),
            ));
        }
        normalize_file(&format!("{}{}", self.path, name.trim_start_matches('/')))
    }

    /// Human-readable size (files only)
    pub fn size_string(&self) -> Option<String> {
        self.filesize
            .map(|size| bytesize::ByteSize::b(size).to_string())
    }
}

/// Which entries a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPattern {
    #[default]
    Both,
    DirOnly,
    FileOnly,
}

impl ListPattern {
    pub fn as_param(&self) -> &'static str {
        match self {
            ListPattern::Both => "eListBoth",
            ListPattern::DirOnly => "eListDirOnly",
            ListPattern::FileOnly => "eListFileOnly",
        }
    }
}

/// Listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOrder {
    #[default]
    Asc,
    Desc,
}

impl ListOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            ListOrder::Asc => "0",
            ListOrder::Desc => "1",
        }
    }
}

/// Largest page the service accepts
pub const MAX_LIST_NUM: u32 = 199;

/// Options for listing a directory
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Entries per page, 1..=199 (default: 20)
    pub num: u32,
    pub pattern: ListPattern,
    pub order: ListOrder,
    /// Opaque continuation token from a previous page
    pub context: String,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            num: 20,
            pattern: ListPattern::Both,
            order: ListOrder::Asc,
            context: String::new(),
        }
    }
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num(mut self, num: u32) -> Self {
        self.num = num;
        self
    }

    pub fn pattern(mut self, pattern: ListPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn order(mut self, order: ListOrder) -> Self {
        self.order = order;
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num == 0 || self.num > MAX_LIST_NUM {
            return Err(CosError::invalid_argument(
                "num",
                format!("List size must be between 1 and {}", MAX_LIST_NUM),
            ));
        }
        Ok(())
    }
}

/// Listing payload as it appears on the wire
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawListPage {
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub context: String,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub dircount: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub filecount: Option<u64>,
    #[serde(default)]
    pub infos: Vec<RawResource>,
}

/// One page of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub entries: Vec<Resource>,
    pub has_more: bool,
    /// Continuation token for the next page
    pub context: String,
    pub dir_count: u64,
    pub file_count: u64,
}

/// `/a/b` → `/a/b/`, `a` → `/a/`, `` → `/`
pub fn normalize_dir(path: &str) -> String {
    let mut path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    if !path.ends_with('/') {
        path.push('/');
    }
    path
}

/// `a/b.txt` → `/a/b.txt`; rejects directory-shaped paths
pub fn normalize_file(path: &str) -> Result<String> {
    if path.is_empty() || path.ends_with('/') {
        return Err(CosError::invalid_argument(
            "path",
            format!("'{}' is not a file path", path),
        ));
    }
    Ok(if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> RawResource {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_listing_kinds() {
        let dir = Resource::from_listing(
            "/path/",
            raw(serde_json::json!({"name": "d1", "ctime": "1500000000", "mtime": "1500000001", "biz_attr": ""})),
        );
        assert!(dir.is_dir());
        assert_eq!(dir.path, "/path/d1/");
        assert_eq!(dir.created_at().unwrap().timestamp(), 1_500_000_000);
        assert_eq!(dir.updated_at().unwrap().timestamp(), 1_500_000_001);

        let file = Resource::from_listing(
            "/path",
            raw(serde_json::json!({"name": "f1", "ctime": 1, "mtime": 2, "filesize": 100, "filelen": 100})),
        );
        assert!(file.is_file());
        assert_eq!(file.path, "/path/f1");
        assert!(file.is_complete());
        assert_eq!(file.size_string().unwrap(), bytesize::ByteSize::b(100).to_string());
    }

    #[test]
    fn test_incomplete_file() {
        let file = Resource::from_listing(
            "/",
            raw(serde_json::json!({"name": "big", "filesize": "100", "filelen": "40"})),
        );
        assert!(!file.is_complete());
    }

    #[test]
    fn test_stat_without_name() {
        let resource = Resource::from_stat("/path/d1/", RawResource::default());
        assert!(resource.is_dir());
        assert_eq!(resource.name, "d1");

        let resource = Resource::from_stat("path/f1", raw(serde_json::json!({"filesize": 3})));
        assert!(resource.is_file());
        assert_eq!(resource.path, "/path/f1");
        assert_eq!(resource.name, "f1");
    }

    #[test]
    fn test_child_path() {
        let dir = Resource::from_listing("/path/", raw(serde_json::json!({"name": "d1"})));
        assert_eq!(dir.child_path("test_file").unwrap(), "/path/d1/test_file");
        assert!(dir.child_path("sub/").is_err());

        let file = Resource::from_listing("/", raw(serde_json::json!({"name": "f", "filesize": 1})));
        assert!(matches!(
            file.child_path("x"),
            Err(CosError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_dir(""), "/");
        assert_eq!(normalize_dir("a/b"), "/a/b/");
        assert_eq!(normalize_dir("/a/"), "/a/");
        assert_eq!(normalize_file("a.txt").unwrap(), "/a.txt");
        assert!(normalize_file("dir/").is_err());
        assert!(normalize_file("").is_err());
    }

    #[test]
    fn test_list_options() {
        let options = ListOptions::new();
        assert_eq!(options.num, 20);
        assert_eq!(options.pattern.as_param(), "eListBoth");
        assert_eq!(options.order.as_param(), "0");
        assert!(options.validate().is_ok());

        assert!(ListOptions::new().num(0).validate().is_err());
        assert!(ListOptions::new().num(200).validate().is_err());
        assert_eq!(ListPattern::FileOnly.as_param(), "eListFileOnly");
        assert_eq!(ListPattern::DirOnly.as_param(), "eListDirOnly");
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let result: std::result::Result<RawResource, _> =
            serde_json::from_value(serde_json::json!({"filesize": "abc"}));
        assert!(result.is_err());
    }
}
