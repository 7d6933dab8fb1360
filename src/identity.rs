//! Identity data model shared by resolution, policy, and rendering.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claims decoded from a verified id token.
pub type Claims = Map<String, Value>;

/// The resolved representation of who is making the request.
///
/// Built once per request by the resolver and immutable afterwards; it is
/// never persisted beyond the request/response cycle it serves. `id` is
/// `None` exactly when the identity is anonymous, and anonymous identities
/// never carry a token.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Option<String>,
    pub claims: Claims,
    pub id_token: Option<String>,
}

impl Identity {
    /// The canonical anonymous identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            id: None,
            claims: Claims::new(),
            id_token: None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.id.is_some()
    }
}

/// Credential pair carried by the token cookie.
///
/// Exists only while the cookie payload is being decoded. Both fields are
/// required: a payload missing either one is treated as no credential.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub id_token: String,
    pub refresh_token: String,
}

/// Pre-verified identity snapshot carried by the user cookie.
///
/// Snapshot sessions carry no token, so the converted identity never has
/// one either.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Option<String>,
    #[serde(default)]
    pub claims: Claims,
}

impl From<SessionSnapshot> for Identity {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            id: snapshot.id,
            claims: snapshot.claims,
            id_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CredentialPair, Identity, SessionSnapshot};
    use serde_json::json;

    #[test]
    fn anonymous_identity_has_no_id_and_no_token() {
        let identity = Identity::anonymous();
        assert!(!identity.is_authenticated());
        assert!(identity.claims.is_empty());
        assert!(identity.id_token.is_none());
    }

    #[test]
    fn identity_serializes_camel_case() {
        let mut identity = Identity::anonymous();
        identity.id = Some("user-1".to_string());
        identity.id_token = Some("token".to_string());

        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(value["id"], json!("user-1"));
        assert_eq!(value["idToken"], json!("token"));
        assert!(value["claims"].is_object());
    }

    #[test]
    fn credential_pair_requires_both_fields() {
        let full: Result<CredentialPair, _> =
            serde_json::from_str(r#"{"idToken":"a","refreshToken":"b"}"#);
        assert!(full.is_ok());

        let missing: Result<CredentialPair, _> = serde_json::from_str(r#"{"idToken":"a"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn snapshot_converts_without_token() {
        let snapshot: SessionSnapshot =
            serde_json::from_str(r#"{"id":"user-2","claims":{"email":"u@example.test"}}"#).unwrap();
        let identity: Identity = snapshot.into();

        assert_eq!(identity.id.as_deref(), Some("user-2"));
        assert_eq!(identity.claims["email"], json!("u@example.test"));
        assert!(identity.id_token.is_none());
    }
}
