//! Process-wide settings.
//!
//! Built once at process start and passed by reference into the
//! per-request machinery; request handling never reaches into ad hoc
//! global state.

use crate::cookie::CookieConfig;

#[derive(Clone, Debug)]
pub struct Settings {
    cookie: CookieConfig,
    auth_page_url: Option<String>,
    app_page_url: Option<String>,
}

impl Settings {
    #[must_use]
    pub fn new(cookie: CookieConfig) -> Self {
        Self {
            cookie,
            auth_page_url: None,
            app_page_url: None,
        }
    }

    /// Default destination for unauthenticated redirects.
    #[must_use]
    pub fn with_auth_page_url(mut self, url: impl Into<String>) -> Self {
        self.auth_page_url = Some(url.into());
        self
    }

    /// Default destination for authenticated redirects.
    #[must_use]
    pub fn with_app_page_url(mut self, url: impl Into<String>) -> Self {
        self.app_page_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn cookie(&self) -> &CookieConfig {
        &self.cookie
    }

    #[must_use]
    pub fn auth_page_url(&self) -> Option<&str> {
        self.auth_page_url.as_deref()
    }

    #[must_use]
    pub fn app_page_url(&self) -> Option<&str> {
        self.app_page_url.as_deref()
    }
}
