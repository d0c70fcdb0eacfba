use crate::client::{CosClient, SignScope};
use crate::error::{CosError, Result};
use crate::storage::types::{
    normalize_dir, ListOptions, ListPage, RawListPage, RawResource, Resource,
};
use crate::transport::RequestBody;
use log::debug;
use serde_json::Value;

/// Response code the service uses for a missing resource
pub const CODE_NOT_FOUND: i64 = -166;

fn parse<T: serde::de::DeserializeOwned + Default>(data: Option<Value>) -> Result<T> {
    match data {
        Some(value) => serde_json::from_value(value).map_err(CosError::from),
        None => Ok(T::default()),
    }
}

pub fn stat(client: &CosClient, bucket: &str, path: &str) -> Result<Resource> {
    if path.is_empty() {
        return Err(CosError::invalid_argument("path", "Path cannot be empty"));
    }

    let data = client.get(bucket, path, &[("op", "stat".to_string())])?;
    let raw: RawResource = parse(data)?;

    Ok(Resource::from_stat(path, raw))
}

/// `false` when the service reports the resource missing; other errors propagate
pub fn exists(client: &CosClient, bucket: &str, path: &str) -> Result<bool> {
    match stat(client, bucket, path) {
        Ok(_) => Ok(true),
        Err(e) if e.server_code() == Some(CODE_NOT_FOUND) => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn list_page(
    client: &CosClient,
    bucket: &str,
    dir: &str,
    options: &ListOptions,
) -> Result<ListPage> {
    options.validate()?;
    let dir = normalize_dir(dir);

    let query = [
        ("context", options.context.clone()),
        ("num", options.num.to_string()),
        ("op", "list".to_string()),
        ("order", options.order.as_param().to_string()),
        ("pattern", options.pattern.as_param().to_string()),
    ];
    let raw: RawListPage = parse(client.get(bucket, &dir, &query)?)?;

    let entries = raw
        .infos
        .into_iter()
        .map(|entry| Resource::from_listing(&dir, entry))
        .collect();

    Ok(ListPage {
        entries,
        has_more: raw.has_more,
        context: raw.context,
        dir_count: raw.dircount.unwrap_or(0),
        file_count: raw.filecount.unwrap_or(0),
    })
}

/// Every entry of `dir`, following continuation tokens
pub fn list(
    client: &CosClient,
    bucket: &str,
    dir: &str,
    options: &ListOptions,
) -> Result<Vec<Resource>> {
    let mut options = options.clone();
    let mut entries = Vec::new();

    loop {
        let page = list_page(client, bucket, dir, &options)?;
        debug!(
            "listed {} entries under {} (has_more: {})",
            page.entries.len(),
            dir,
            page.has_more
        );
        entries.extend(page.entries);

        if !page.has_more || page.context.is_empty() || page.context == options.context {
            break;
        }
        options.context = page.context;
    }

    Ok(entries)
}

/// Number of directories plus files directly under `dir`
pub fn count(client: &CosClient, bucket: &str, dir: &str) -> Result<u64> {
    let page = list_page(client, bucket, dir, &ListOptions::new().num(1))?;
    Ok(page.dir_count + page.file_count)
}

pub fn create_folder(client: &CosClient, bucket: &str, dir: &str) -> Result<Resource> {
    let dir = normalize_dir(dir);
    if dir == "/" {
        return Err(CosError::invalid_argument(
            "dir",
            "Cannot create the bucket root",
        ));
    }

    let body = RequestBody::Json(serde_json::json!({"op": "create", "biz_attr": ""}));
    let raw: RawResource = parse(client.post(bucket, &dir, body, SignScope::Multiple)?)?;

    Ok(Resource::from_stat(&dir, raw))
}

pub fn delete(client: &CosClient, bucket: &str, path: &str) -> Result<()> {
    if path.is_empty() || path == "/" {
        return Err(CosError::invalid_argument(
            "path",
            "Cannot delete the bucket root",
        ));
    }

    let body = RequestBody::Json(serde_json::json!({"op": "delete"}));
    client.post(bucket, path, body, SignScope::Once)?;
    Ok(())
}
