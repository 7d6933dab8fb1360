//! Session gate: the composition surface for server-rendered pages.
//!
//! A [`SessionGate`] is built once per process from the settings and the
//! identity provider; [`SessionGate::page`] composes a per-page handler
//! from a redirect policy, a session mode, and the page's own data
//! provider. Within one request the ordering is fixed: resolution
//! completes before the policy is evaluated, and the wrapped provider only
//! runs when no redirect was decided.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::Settings;
use crate::policy::{decide, PolicyError, SessionPolicy};
use crate::provider::IdentityProvider;
use crate::render::{merge_props, PageContext, PageDataProvider, PageProps, RenderResult};
use crate::request::RequestCookies;
use crate::resolve::{resolve, SessionMode};

/// Why a gated request failed outright.
///
/// Credential problems never show up here; they resolved to the anonymous
/// identity upstream.
#[derive(Debug, Error)]
pub enum GateError {
    /// A redirect was mandated with no configured destination.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// The wrapped page data provider failed.
    #[error("page data provider failed: {0}")]
    Page(#[source] anyhow::Error),
}

/// Builds per-request handlers that resolve the session before rendering.
#[derive(Clone)]
pub struct SessionGate {
    settings: Arc<Settings>,
    provider: Arc<dyn IdentityProvider>,
}

impl SessionGate {
    #[must_use]
    pub fn new(settings: Settings, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            settings: Arc::new(settings),
            provider,
        }
    }

    /// Compose the handler for one page.
    #[must_use]
    pub fn page(
        &self,
        policy: SessionPolicy,
        mode: SessionMode,
        data: Option<Arc<dyn PageDataProvider>>,
    ) -> PageHandler {
        PageHandler {
            settings: Arc::clone(&self.settings),
            provider: Arc::clone(&self.provider),
            policy,
            mode,
            data,
        }
    }
}

/// Per-page handler produced by [`SessionGate::page`].
#[derive(Clone)]
pub struct PageHandler {
    settings: Arc<Settings>,
    provider: Arc<dyn IdentityProvider>,
    policy: SessionPolicy,
    mode: SessionMode,
    data: Option<Arc<dyn PageDataProvider>>,
}

impl PageHandler {
    /// Gate one request: resolve the identity, apply the redirect policy,
    /// then render or short-circuit.
    ///
    /// Dropping the returned future abandons any in-flight provider call;
    /// nothing is spawned or retried.
    pub async fn handle(&self, request: &dyn RequestCookies) -> Result<RenderResult, GateError> {
        let identity = resolve(request, self.mode, &self.settings, self.provider.as_ref()).await;

        if let Some(redirect) = decide(&identity, &self.policy, &self.settings)? {
            debug!("redirecting to {}", redirect.destination);
            return Ok(RenderResult::Redirect(redirect));
        }

        let props = match &self.data {
            Some(data) => {
                let ctx = PageContext {
                    request,
                    identity: &identity,
                };
                data.page_props(ctx).await.map_err(GateError::Page)?
            }
            None => PageProps::new(),
        };

        Ok(RenderResult::Props(merge_props(props, &identity)))
    }
}

#[cfg(test)]
mod tests {
    use super::{GateError, SessionGate};
    use crate::config::Settings;
    use crate::cookie::CookieConfig;
    use crate::identity::Claims;
    use crate::policy::{SessionPolicy, UnauthedAction};
    use crate::provider::{BoxFuture, IdentityProvider, ProviderError};
    use crate::render::{PageContext, PageDataProvider, PageProps, RenderResult, IDENTITY_PROP_KEY};
    use crate::resolve::SessionMode;
    use axum::http::HeaderMap;
    use secrecy::SecretString;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RejectingProvider;

    impl IdentityProvider for RejectingProvider {
        fn verify_id_token<'a>(
            &'a self,
            _id_token: &'a str,
        ) -> BoxFuture<'a, Result<Claims, ProviderError>> {
            Box::pin(async { Err(ProviderError::Rejected("expired".to_string())) })
        }

        fn refresh_id_token<'a>(
            &'a self,
            _refresh_token: &'a str,
        ) -> BoxFuture<'a, Result<String, ProviderError>> {
            Box::pin(async { Err(ProviderError::Rejected("revoked".to_string())) })
        }
    }

    #[derive(Default)]
    struct CountingPage {
        calls: AtomicUsize,
    }

    impl PageDataProvider for CountingPage {
        fn page_props<'a>(
            &'a self,
            _ctx: PageContext<'a>,
        ) -> BoxFuture<'a, anyhow::Result<PageProps>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let mut props = PageProps::new();
                props.insert("title".to_string(), json!("Home"));
                Ok(props)
            })
        }
    }

    fn gate() -> SessionGate {
        let settings =
            Settings::new(CookieConfig::new(vec![SecretString::from("k1".to_string())]));
        SessionGate::new(settings, Arc::new(RejectingProvider))
    }

    #[tokio::test]
    async fn anonymous_render_invokes_the_page_exactly_once() {
        let page = Arc::new(CountingPage::default());
        let handler = gate().page(
            SessionPolicy::default(),
            SessionMode::Tokens,
            Some(Arc::clone(&page) as Arc<dyn PageDataProvider>),
        );

        let result = handler.handle(&HeaderMap::new()).await.unwrap();

        let RenderResult::Props(props) = result else {
            panic!("expected props");
        };
        assert_eq!(props["title"], json!("Home"));
        assert_eq!(props[IDENTITY_PROP_KEY]["id"], json!(null));
        assert_eq!(page.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn redirect_short_circuits_the_page() {
        let page = Arc::new(CountingPage::default());
        let policy = SessionPolicy {
            when_unauthed: UnauthedAction::RedirectToLogin,
            auth_page_url: Some("/login".to_string()),
            ..SessionPolicy::default()
        };
        let handler = gate().page(
            policy,
            SessionMode::Tokens,
            Some(Arc::clone(&page) as Arc<dyn PageDataProvider>),
        );

        let result = handler.handle(&HeaderMap::new()).await.unwrap();

        let RenderResult::Redirect(redirect) = result else {
            panic!("expected redirect");
        };
        assert_eq!(redirect.destination, "/login");
        assert_eq!(page.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_redirect_destination_fails_the_request() {
        let policy = SessionPolicy {
            when_unauthed: UnauthedAction::RedirectToLogin,
            ..SessionPolicy::default()
        };
        let handler = gate().page(policy, SessionMode::Tokens, None);

        let result = handler.handle(&HeaderMap::new()).await;

        assert!(matches!(result, Err(GateError::Policy(_))));
    }

    #[tokio::test]
    async fn page_without_data_provider_still_carries_the_identity() {
        let handler = gate().page(SessionPolicy::default(), SessionMode::Tokens, None);

        let result = handler.handle(&HeaderMap::new()).await.unwrap();

        let RenderResult::Props(props) = result else {
            panic!("expected props");
        };
        assert!(props.contains_key(IDENTITY_PROP_KEY));
    }

    #[tokio::test]
    async fn page_failure_propagates() {
        struct FailingPage;

        impl PageDataProvider for FailingPage {
            fn page_props<'a>(
                &'a self,
                _ctx: PageContext<'a>,
            ) -> BoxFuture<'a, anyhow::Result<PageProps>> {
                Box::pin(async { Err(anyhow::anyhow!("database unavailable")) })
            }
        }

        let handler = gate().page(
            SessionPolicy::default(),
            SessionMode::Tokens,
            Some(Arc::new(FailingPage)),
        );

        let result = handler.handle(&HeaderMap::new()).await;

        assert!(matches!(result, Err(GateError::Page(_))));
    }
}
