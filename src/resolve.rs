//! Identity resolution from request cookies.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::identity::{CredentialPair, Identity, SessionSnapshot};
use crate::provider::IdentityProvider;
use crate::request::RequestCookies;
use crate::verify::verify;

/// How session state travels between requests.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Credential pair in the token cookie, verified (and refreshed at most
    /// once) against the identity provider on every request.
    #[default]
    Tokens,
    /// Pre-verified identity snapshot in the user cookie, trusted on
    /// signature alone with no network call. Reduced security: no
    /// freshness or revocation check. See the crate docs.
    Snapshot,
}

/// Resolve the identity behind a request.
///
/// Never fails: a missing, malformed, or unverifiable credential resolves
/// to the anonymous identity. When no credential is present the provider
/// is not contacted at all.
pub async fn resolve(
    request: &dyn RequestCookies,
    mode: SessionMode,
    settings: &Settings,
    provider: &dyn IdentityProvider,
) -> Identity {
    match mode {
        SessionMode::Tokens => resolve_tokens(request, settings, provider).await,
        SessionMode::Snapshot => resolve_snapshot(request, settings),
    }
}

async fn resolve_tokens(
    request: &dyn RequestCookies,
    settings: &Settings,
    provider: &dyn IdentityProvider,
) -> Identity {
    let cookie = settings.cookie();
    let Some(payload) = cookie.decode(&cookie.tokens_cookie_name(), request) else {
        debug!("no token cookie, resolving as anonymous");
        return Identity::anonymous();
    };

    // A payload missing either credential is no credential at all.
    let pair: CredentialPair = match serde_json::from_str(&payload) {
        Ok(pair) => pair,
        Err(err) => {
            warn!("malformed token cookie payload: {err}");
            return Identity::anonymous();
        }
    };

    match verify(provider, &pair.id_token, Some(&pair.refresh_token)).await {
        Ok(identity) => identity,
        Err(err) => {
            debug!("session verification failed, resolving as anonymous: {err}");
            Identity::anonymous()
        }
    }
}

fn resolve_snapshot(request: &dyn RequestCookies, settings: &Settings) -> Identity {
    let cookie = settings.cookie();
    let Some(payload) = cookie.decode(&cookie.user_cookie_name(), request) else {
        debug!("no user cookie, resolving as anonymous");
        return Identity::anonymous();
    };

    match serde_json::from_str::<SessionSnapshot>(&payload) {
        Ok(snapshot) => snapshot.into(),
        Err(err) => {
            warn!("malformed user cookie payload: {err}");
            Identity::anonymous()
        }
    }
}
