//! Session cookies
//!
//! The backend keeps both JWTs in HTTP-only cookies. We keep our own jar
//! so it can be persisted between CLI runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<BTreeMap<String, String>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: BTreeMap<String, String>) -> Self {
        Self {
            cookies: Mutex::new(map),
        }
    }

    /// Apply one `Set-Cookie` header value
    ///
    /// An empty value or a non-positive `Max-Age` deletes the cookie, which
    /// is how the backend clears tokens on logout.
    pub fn store(&self, set_cookie: &str) {
        let mut attributes = set_cookie.split(';');
        let Some((name, value)) = attributes.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let name = name.trim();
        let value = value.trim().trim_matches('"');
        if name.is_empty() {
            return;
        }

        let expired = attributes.any(|attr| {
            let Some((key, val)) = attr.split_once('=') else {
                return false;
            };
            key.trim().eq_ignore_ascii_case("max-age")
                && val.trim().parse::<i64>().is_ok_and(|age| age <= 0)
        });

        let Ok(mut cookies) = self.cookies.lock() else {
            return;
        };
        if expired || value.is_empty() {
            cookies.remove(name);
        } else {
            cookies.insert(name.to_string(), value.to_string());
        }
    }

    /// Value for the `Cookie` request header
    pub fn header(&self) -> Option<String> {
        let cookies = self.cookies.lock().ok()?;
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.cookies
            .lock()
            .map(|cookies| cookies.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut cookies) = self.cookies.lock() {
            cookies.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.lock().map(|c| c.is_empty()).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_header() {
        let jar = CookieJar::new();
        jar.store("access_token=abc; HttpOnly; Path=/; SameSite=Lax");
        jar.store("refresh_token=xyz; HttpOnly; Max-Age=604800; Path=/");
        assert_eq!(
            jar.header().as_deref(),
            Some("access_token=abc; refresh_token=xyz")
        );
    }

    #[test]
    fn test_delete_cookie_forms() {
        let jar = CookieJar::new();
        jar.store("access_token=abc");
        jar.store("refresh_token=xyz");
        jar.store("access_token=\"\"; expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Path=/");
        jar.store("refresh_token=; Path=/");
        assert!(jar.is_empty());
        assert_eq!(jar.header(), None);
    }

    #[test]
    fn test_malformed_header_ignored() {
        let jar = CookieJar::new();
        jar.store("garbage");
        jar.store("=value");
        assert!(jar.is_empty());
    }

    #[test]
    fn test_from_map_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert("csrftoken".to_string(), "t".to_string());
        let jar = CookieJar::from_map(map.clone());
        assert_eq!(jar.snapshot(), map);
        jar.clear();
        assert!(jar.is_empty());
    }
}
