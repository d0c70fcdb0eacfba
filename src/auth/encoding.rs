//! Encodings shared by the signer and the URL builder

/// Percent-encode a path, leaving `/` separators untouched.
///
/// Every byte outside `A-Za-z0-9-_.~` is escaped, so reserved characters
/// such as `?`, `#`, `&` or spaces inside a segment never change how the
/// server splits the identifier.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// `application/x-www-form-urlencoded` encoding of a single component.
///
/// Keeps `A-Za-z0-9*-._`, turns space into `+` and escapes everything else,
/// `~` included.
pub fn form_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Serialize ordered pairs as `k=v&k=v`, form-encoded, preserving order
pub fn form_encode<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", form_component(k.as_ref()), form_component(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}
