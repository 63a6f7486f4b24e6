/// Header names only. Gateway headers carry API keys, so values are never logged.
pub fn header_names(headers: &[(String, String)]) -> String {
    headers.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(", ")
}

/// Response bodies can be long HTML error pages. Keep the first `max` characters.
pub fn truncate_body(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", &body[..i]),
        None => body.to_string(),
    }
}
