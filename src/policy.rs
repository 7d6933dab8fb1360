//! Redirect policy evaluation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;
use crate::identity::Identity;

/// What to do with an authenticated visitor.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthedAction {
    /// Render the page.
    #[default]
    Render,
    /// Send the signed-in visitor to the app page.
    RedirectToApp,
}

/// What to do with an unauthenticated visitor.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthedAction {
    /// Render the page.
    #[default]
    Render,
    /// Send the visitor to the login page.
    RedirectToLogin,
}

/// Per-page redirect policy, with optional page-level URL overrides of the
/// process-wide defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    pub when_authed: AuthedAction,
    pub when_unauthed: UnauthedAction,
    pub app_page_url: Option<String>,
    pub auth_page_url: Option<String>,
}

/// A navigation override decided from authentication state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Redirect {
    pub destination: String,
    pub permanent: bool,
}

/// A redirect was mandated but no destination is configured.
///
/// This is a deployment bug, not a runtime condition: the request fails
/// instead of guessing a destination.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum PolicyError {
    #[error("unauthenticated redirect mandated but no login page url is configured")]
    MissingLoginUrl,
    #[error("authenticated redirect mandated but no app page url is configured")]
    MissingAppUrl,
}

/// Decide whether the resolved identity forces a redirect.
///
/// The unauthenticated check runs first. Redirects are never permanent:
/// they depend on per-request auth state and must not be cached.
pub fn decide(
    identity: &Identity,
    policy: &SessionPolicy,
    settings: &Settings,
) -> Result<Option<Redirect>, PolicyError> {
    if !identity.is_authenticated() && policy.when_unauthed == UnauthedAction::RedirectToLogin {
        let destination = policy
            .auth_page_url
            .as_deref()
            .or_else(|| settings.auth_page_url())
            .ok_or(PolicyError::MissingLoginUrl)?;

        return Ok(Some(Redirect {
            destination: destination.to_string(),
            permanent: false,
        }));
    }

    if identity.is_authenticated() && policy.when_authed == AuthedAction::RedirectToApp {
        let destination = policy
            .app_page_url
            .as_deref()
            .or_else(|| settings.app_page_url())
            .ok_or(PolicyError::MissingAppUrl)?;

        return Ok(Some(Redirect {
            destination: destination.to_string(),
            permanent: false,
        }));
    }

    Ok(None)
}
