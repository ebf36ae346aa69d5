use crate::url::CanonicalUrl;
use crate::{UrlError, UrlResult};
use url::{ParseError, Url};

/// Scheme given to protocol-relative and scheme-less hrefs
const DEFAULT_SCHEME: &str = "https";

/// Normalizes a raw href found on `parent` into a canonical URL
///
/// # Normalization Steps
///
/// 1. Rewrite protocol-relative hrefs (`//host/path`) to `https://host/path`
/// 2. Parse the href; if it is absolute and has a host, use it as is
/// 3. Otherwise resolve it against the parent:
///    - a path not starting with `/` joins onto the parent's path
///    - a path starting with `/` joins onto the parent's origin
/// 4. Reject anything that is not http(s) or has no host
/// 5. Drop the fragment
///
/// Relative resolution follows RFC 3986: the parent's last path segment is
/// replaced unless the parent path ends with `/`.
///
/// # Examples
///
/// ```
/// use href_harvest::url::{normalize, normalize_seed};
///
/// let parent = normalize_seed("https://x.com/p/q").unwrap();
/// assert_eq!(normalize("/a/b", &parent).unwrap().as_str(), "https://x.com/a/b");
///
/// let parent = normalize_seed("https://x.com/p/").unwrap();
/// assert_eq!(normalize("c/d", &parent).unwrap().as_str(), "https://x.com/p/c/d");
///
/// assert_eq!(
///     normalize("//cdn.x.com/f.js", &parent).unwrap().as_str(),
///     "https://cdn.x.com/f.js"
/// );
/// ```
pub fn normalize(raw: &str, parent: &CanonicalUrl) -> UrlResult<CanonicalUrl> {
    let href = expand_protocol_relative(raw.trim());

    match Url::parse(&href) {
        Ok(url) => into_canonical(url),
        Err(ParseError::RelativeUrlWithoutBase) => {
            let joined = parent.as_url().join(&href).map_err(|e| {
                UrlError::Malformed(format!("cannot resolve '{}' against {}: {}", href, parent, e))
            })?;
            into_canonical(joined)
        }
        Err(e) => Err(UrlError::Parse(format!("{}: {}", href, e))),
    }
}

/// Normalizes a start URL, which has no parent to resolve against
///
/// Scheme-less input gets an `https://` prefix; an explicit `http://` is kept.
///
/// # Examples
///
/// ```
/// use href_harvest::url::normalize_seed;
///
/// assert_eq!(normalize_seed("example.com").unwrap().as_str(), "https://example.com/");
/// assert_eq!(normalize_seed("//example.com/a").unwrap().as_str(), "https://example.com/a");
/// ```
pub fn normalize_seed(raw: &str) -> UrlResult<CanonicalUrl> {
    let href = expand_protocol_relative(raw.trim());

    if href.len() < super::MIN_HREF_LEN {
        return Err(UrlError::Malformed(format!("start URL '{}' is too short", raw)));
    }

    let href = if href.contains("://") {
        href
    } else {
        format!("{}://{}", DEFAULT_SCHEME, href)
    };

    let url = Url::parse(&href).map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
    into_canonical(url)
}

/// Rewrites `//host/path` as `https://host/path`
fn expand_protocol_relative(href: &str) -> String {
    match href.strip_prefix("//") {
        Some(rest) => format!("{}://{}", DEFAULT_SCHEME, rest),
        None => href.to_string(),
    }
}

/// Validates a parsed URL and wraps it as canonical
fn into_canonical(mut url: Url) -> UrlResult<CanonicalUrl> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    url.set_fragment(None);

    Ok(CanonicalUrl::from_url(url))
}
