//! Narrow request-context interface for cookie access.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

/// Read-only cookie access on an incoming request.
///
/// The rendering framework owns the request and response; session
/// resolution only needs the `Cookie` header, so this is the whole
/// integration surface on the read side.
pub trait RequestCookies {
    /// Raw value of the named cookie, if present.
    fn cookie(&self, name: &str) -> Option<String>;
}

impl RequestCookies for HeaderMap {
    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.get(COOKIE)?;
        let value = header.to_str().ok()?;
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == name {
                return Some(val.trim().to_string());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::RequestCookies;
    use axum::http::header::COOKIE;
    use axum::http::{HeaderMap, HeaderValue};

    fn headers(cookie_header: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie_header).unwrap());
        headers
    }

    #[test]
    fn finds_cookie_among_many() {
        let headers = headers("a=1; session=abc.def; b=2");
        assert_eq!(headers.cookie("session").as_deref(), Some("abc.def"));
        assert_eq!(headers.cookie("b").as_deref(), Some("2"));
    }

    #[test]
    fn missing_cookie_is_none() {
        let headers = headers("a=1");
        assert!(headers.cookie("session").is_none());
        assert!(HeaderMap::new().cookie("session").is_none());
    }

    #[test]
    fn skips_malformed_pairs() {
        let headers = headers("garbage; session=ok");
        assert_eq!(headers.cookie("session").as_deref(), Some("ok"));
    }
}
