//! Signed session cookie codec.
//!
//! Cookie values are base64url payloads followed by an HMAC-SHA256
//! signature over the encoded payload: `payload "." signature`. Decoding
//! tries every configured key in order so keys can rotate without
//! invalidating live sessions. A bad signature reads the same as a missing
//! cookie: tampering degrades the session to anonymous, it never fails the
//! request.

use axum::http::header::InvalidHeaderValue;
use axum::http::HeaderValue;
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use crate::request::RequestCookies;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_COOKIE_NAME: &str = "portero_session";
const TOKENS_COOKIE_SUFFIX: &str = "_tokens";
const USER_COOKIE_SUFFIX: &str = "_user";

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("no signing keys configured")]
    NoKeys,
    #[error("cookie signing failed")]
    Sign,
    #[error("invalid cookie header value")]
    HeaderValue(#[from] InvalidHeaderValue),
}

/// Cookie names, signing keys, and flags for the session cookies.
///
/// `keys` is ordered: the first key signs new cookies, every key is
/// accepted when verifying, so rotation is prepend-and-drain.
#[derive(Clone, Debug)]
pub struct CookieConfig {
    name: String,
    keys: Vec<SecretString>,
    secure: bool,
    signed: bool,
}

impl CookieConfig {
    #[must_use]
    pub fn new(keys: Vec<SecretString>) -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            keys,
            secure: true,
            signed: true,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    /// Name of the cookie carrying the credential pair.
    #[must_use]
    pub fn tokens_cookie_name(&self) -> String {
        format!("{}{TOKENS_COOKIE_SUFFIX}", self.name)
    }

    /// Name of the cookie carrying the identity snapshot.
    #[must_use]
    pub fn user_cookie_name(&self) -> String {
        format!("{}{USER_COOKIE_SUFFIX}", self.name)
    }

    /// Read and authenticate the named cookie.
    ///
    /// Returns `None` when the cookie is missing, structurally malformed,
    /// or fails signature verification under every configured key.
    pub fn decode(&self, name: &str, request: &dyn RequestCookies) -> Option<String> {
        let raw = request.cookie(name)?;
        if !self.signed {
            return decode_payload(&raw);
        }

        let (payload_b64, signature_b64) = raw.rsplit_once('.')?;
        let signature = Base64UrlUnpadded::decode_vec(signature_b64).ok()?;
        for key in &self.keys {
            if verify_signature(key, payload_b64, &signature) {
                return decode_payload(payload_b64);
            }
        }

        debug!("cookie {name} failed signature verification");
        None
    }

    /// Encode a payload into a cookie value, signing with the current key.
    ///
    /// The write side lives with the collaborator that sets cookies; this
    /// is the symmetric companion to [`CookieConfig::decode`].
    pub fn encode(&self, payload: &str) -> Result<String, CookieError> {
        let payload_b64 = Base64UrlUnpadded::encode_string(payload.as_bytes());
        if !self.signed {
            return Ok(payload_b64);
        }

        let key = self.keys.first().ok_or(CookieError::NoKeys)?;
        let signature = sign(key, &payload_b64)?;
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature);
        Ok(format!("{payload_b64}.{signature_b64}"))
    }

    /// Build a `Set-Cookie` value for a session cookie.
    pub fn set_cookie_header(
        &self,
        name: &str,
        value: &str,
        max_age_seconds: i64,
    ) -> Result<HeaderValue, CookieError> {
        let mut cookie =
            format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        Ok(HeaderValue::from_str(&cookie)?)
    }

    /// Build a `Set-Cookie` value that clears a session cookie.
    pub fn clear_cookie_header(&self, name: &str) -> Result<HeaderValue, CookieError> {
        self.set_cookie_header(name, "", 0)
    }
}

fn sign(key: &SecretString, payload_b64: &str) -> Result<Vec<u8>, CookieError> {
    let mut mac = HmacSha256::new_from_slice(key.expose_secret().as_bytes())
        .map_err(|_| CookieError::Sign)?;
    mac.update(payload_b64.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn verify_signature(key: &SecretString, payload_b64: &str, signature: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(key.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(signature).is_ok()
}

fn decode_payload(payload_b64: &str) -> Option<String> {
    let bytes = Base64UrlUnpadded::decode_vec(payload_b64).ok()?;
    String::from_utf8(bytes).ok()
}
