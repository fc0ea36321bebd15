/// Parse a request path for `--verify-url`.
///
/// Must start with `/`; a query string is allowed.
pub fn parse_url_path(s: &str) -> Result<String, String> {
    if !s.starts_with('/') {
        return Err(format!("URL must be a path starting with '/': '{}'", s));
    }

    if s.chars().any(char::is_whitespace) {
        return Err(format!("URL must not contain whitespace: '{}'", s));
    }

    Ok(s.to_string())
}
