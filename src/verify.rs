//! Identity verification with a single refresh attempt.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::identity::{Claims, Identity};
use crate::provider::{IdentityProvider, ProviderError};

/// Why a credential could not be turned into a verified identity.
///
/// Every variant is a transient credential failure the resolver converts to
/// the anonymous identity. The request/response cycle is the retry
/// boundary: a later request carries a fresh cookie, so nothing is retried
/// here.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("id token rejected with no refresh token available: {0}")]
    Rejected(#[source] ProviderError),
    #[error("refresh exchange failed: {0}")]
    RefreshFailed(#[source] ProviderError),
    #[error("refreshed id token rejected: {0}")]
    RefreshedTokenRejected(#[source] ProviderError),
    #[error("verified token carries no subject")]
    MissingSubject,
}

/// Verify an id token, refreshing it at most once.
///
/// Phase one validates the token as-is. When the provider rejects it
/// (expired or otherwise invalid) and a refresh token is available, phase
/// two performs exactly one refresh exchange and verifies the minted
/// token.
pub async fn verify(
    provider: &dyn IdentityProvider,
    id_token: &str,
    refresh_token: Option<&str>,
) -> Result<Identity, VerifyError> {
    match provider.verify_id_token(id_token).await {
        Ok(claims) => identity_from_claims(claims, id_token),
        Err(err) => {
            let Some(refresh_token) = refresh_token else {
                return Err(VerifyError::Rejected(err));
            };

            debug!("id token rejected, attempting refresh: {err}");

            let minted = provider
                .refresh_id_token(refresh_token)
                .await
                .map_err(VerifyError::RefreshFailed)?;
            let claims = provider
                .verify_id_token(&minted)
                .await
                .map_err(VerifyError::RefreshedTokenRejected)?;

            identity_from_claims(claims, &minted)
        }
    }
}

/// The subject claim becomes the identity's id; a verified token without
/// one cannot produce an authenticated identity.
fn identity_from_claims(claims: Claims, id_token: &str) -> Result<Identity, VerifyError> {
    let id = claims
        .get("sub")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(VerifyError::MissingSubject)?;

    Ok(Identity {
        id: Some(id),
        claims,
        id_token: Some(id_token.to_string()),
    })
}
