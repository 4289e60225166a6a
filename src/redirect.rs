//! Parsing of redirect request paths into dashboard names

/// Default mount point of the redirect surface
pub const DEFAULT_REDIRECT_BASE: &str = "/dashboards";

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Extract the dashboard name from `{base}/{name}`.
///
/// Exactly one segment must follow `base`, without a trailing slash, made of
/// ASCII letters, digits, `-` and `_`. An empty `base` accepts `/{name}`.
pub fn parse_dashboard_name<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    let name = path.strip_prefix(base)?.strip_prefix('/')?;
    if name.is_empty() || !name.chars().all(is_name_char) {
        return None;
    }
    Some(name)
}
