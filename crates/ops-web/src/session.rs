//! Signed session cookie
//!
//! The browser keeps its agent session id in `ops_session=<id>.<mac>`, where
//! `<mac>` is an HMAC-SHA256 of the id under the server secret, base64url
//! without padding.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use ops_core::{Error, Result, Settings};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "ops_session";

#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
}

impl SessionSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|e| Error::config(format!("invalid session secret: {}", e)))?;
        Ok(Self { mac })
    }

    /// Signer with a per-process random key; sessions do not survive restarts
    pub fn random() -> Result<Self> {
        Self::new(rand::random::<[u8; 32]>())
    }

    /// Use `SECRET_KEY` when set, otherwise a random key
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        match settings.secret_key.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Self::new(secret),
            _ => {
                warn!("SECRET_KEY not set, chat sessions will reset on restart");
                Self::random()
            }
        }
    }

    fn signature(&self, session_id: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(session_id.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Cookie value for a session id
    pub fn sign(&self, session_id: &str) -> String {
        format!("{}.{}", session_id, URL_SAFE_NO_PAD.encode(self.signature(session_id)))
    }

    /// Session id from a cookie value, if the signature checks out
    pub fn verify(&self, value: &str) -> Option<String> {
        let (session_id, signature) = value.rsplit_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(session_id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(session_id.to_string())
    }

    /// Verified session id from the request cookies
    pub fn session_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == SESSION_COOKIE)
            .find_map(|(_, value)| self.verify(value))
    }

    /// `Set-Cookie` header value for a session id
    pub fn set_cookie(&self, session_id: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            self.sign(session_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_sign_then_verify() {
        let signer = SessionSigner::new("s3cret").unwrap();
        let cookie = signer.sign("3f1c-session");
        assert!(cookie.starts_with("3f1c-session."));
        assert_eq!(signer.verify(&cookie).as_deref(), Some("3f1c-session"));
    }

    #[test]
    fn test_tampered_or_foreign_cookie_rejected() {
        let signer = SessionSigner::new("s3cret").unwrap();
        let other = SessionSigner::new("different").unwrap();
        let cookie = signer.sign("abc");

        assert_eq!(other.verify(&cookie), None);
        assert_eq!(signer.verify(&cookie.replace("abc", "abd")), None);
        assert_eq!(signer.verify("abc"), None);
        assert_eq!(signer.verify("abc.!!!"), None);
    }

    #[test]
    fn test_session_from_headers() {
        let signer = SessionSigner::new("s3cret").unwrap();
        let mut headers = HeaderMap::new();
        let value = format!("theme=dark; {}={}", SESSION_COOKIE, signer.sign("abc"));
        headers.insert(header::COOKIE, HeaderValue::from_str(&value).unwrap());
        assert_eq!(signer.session_from_headers(&headers).as_deref(), Some("abc"));
        assert_eq!(signer.session_from_headers(&HeaderMap::new()), None);
    }
}
