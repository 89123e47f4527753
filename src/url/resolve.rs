use crate::UrlError;
use url::Url;

/// Returns true when the link already carries an `http://` or `https://` prefix
pub fn is_absolute_http(link: &str) -> bool {
    let lower = link.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Returns the scheme of a link such as `mailto:x@y` or `javascript:void(0)`
///
/// A scheme is a letter followed by letters, digits, `+`, `-` or `.`, ending
/// at a `:` that comes before any `/`, `?` or `#`.
fn link_scheme(link: &str) -> Option<&str> {
    let end = link.find(':')?;
    let candidate = &link[..end];
    if candidate.contains(|c: char| matches!(c, '/' | '?' | '#')) {
        return None;
    }

    let mut chars = candidate.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        Some(candidate)
    } else {
        None
    }
}

/// Resolves an extracted detail link into the URL that identifies the article
///
/// Absolute http(s) links are returned unchanged (trimmed). Anything else is
/// treated as relative to the *root* of the source: the source's scheme, host
/// and port are kept, its path and query are dropped, and a leading `./` or
/// `/` on the link is ignored. So `testing`, `./testing` and `/testing` on
/// `https://research.swtch.com/blog/` all become
/// `https://research.swtch.com/testing`.
///
/// A protocol-relative link (`//cdn.example.org/p`) takes the source's scheme.
/// Links with any other scheme, such as `mailto:` or `javascript:`, are
/// rejected with [`UrlError::InvalidScheme`].
///
/// # Examples
///
/// ```
/// use feedrelay::url::resolve_detail_url;
///
/// let url = resolve_detail_url("https://x.com/", "/post/1").unwrap();
/// assert_eq!(url, "https://x.com/post/1");
/// ```
pub fn resolve_detail_url(source_url: &str, link: &str) -> Result<String, UrlError> {
    let link = link.trim();

    if is_absolute_http(link) {
        return Ok(link.to_string());
    }

    let mut origin = Url::parse(source_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if origin.scheme() != "http" && origin.scheme() != "https" {
        return Err(UrlError::InvalidScheme(origin.scheme().to_string()));
    }

    if origin.host_str().is_none() {
        return Err(UrlError::MissingHost(source_url.to_string()));
    }

    if link.starts_with("//") {
        let absolute = format!("{}:{}", origin.scheme(), link);
        let url =
            Url::parse(&absolute).map_err(|e| UrlError::Parse(format!("{}: {}", link, e)))?;
        if url.host_str().is_none() {
            return Err(UrlError::MissingHost(link.to_string()));
        }
        return Ok(String::from(url));
    }

    if let Some(scheme) = link_scheme(link) {
        return Err(UrlError::InvalidScheme(scheme.to_string()));
    }

    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);

    let relative = link.strip_prefix('.').unwrap_or(link);
    let relative = relative.trim_start_matches('/');

    origin
        .join(&format!("/{}", relative))
        .map(String::from)
        .map_err(|e| UrlError::Parse(format!("{}: {}", link, e)))
}
