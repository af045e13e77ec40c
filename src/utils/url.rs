//! Endpoint URL construction for the backend client.

/// Join a base URL and an endpoint path with exactly one slash between them.
///
/// ```
/// use pixelverse::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:12345/", "/api/llm/providers"),
///     "http://localhost:12345/api/llm/providers"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Percent-encode an id for use as a single path segment.
pub fn path_segment(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
