use url::Url;

/// Reduces a URL to its domain-root: scheme, `://`, host, and any explicit port
///
/// Domain-roots are the unit of frontier expansion. Paths, queries and
/// fragments are dropped.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use driftnet::url::domain_root;
///
/// let url = Url::parse("https://ex.com/x?y=1#z").unwrap();
/// assert_eq!(domain_root(&url), Some("https://ex.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/page").unwrap();
/// assert_eq!(domain_root(&url), Some("http://127.0.0.1:8080".to_string()));
/// ```
pub fn domain_root(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}
