//! Render results, page data providers, and prop merging.

use serde_json::{Map, Value};
use tracing::warn;

use crate::identity::Identity;
use crate::policy::Redirect;
use crate::provider::BoxFuture;
use crate::request::RequestCookies;

/// Props handed to the rendering framework.
pub type PageProps = Map<String, Value>;

/// Reserved prop key carrying the serialized identity.
pub const IDENTITY_PROP_KEY: &str = "sessionIdentity";

/// Outcome of gating a page: redirect the request, or render with props.
///
/// The rendering framework must handle both variants; there is no implicit
/// conversion between them.
#[derive(Clone, Debug)]
pub enum RenderResult {
    Redirect(Redirect),
    Props(PageProps),
}

/// Per-request context handed to a wrapped page data provider.
pub struct PageContext<'a> {
    /// Cookie access on the underlying request.
    pub request: &'a dyn RequestCookies,
    /// The identity resolved for this request.
    pub identity: &'a Identity,
}

/// A page's own server-side data provider, wrapped by the session gate.
pub trait PageDataProvider: Send + Sync {
    /// Produce the props for one request. Single-shot: the gate awaits the
    /// result once and never retries; dropping the future cancels the
    /// fetch.
    fn page_props<'a>(&'a self, ctx: PageContext<'a>)
        -> BoxFuture<'a, anyhow::Result<PageProps>>;
}

/// Merge provider props with the serialized identity.
///
/// The reserved key is written last, so a provider can never put its own
/// value underneath it.
#[must_use]
pub fn merge_props(mut props: PageProps, identity: &Identity) -> PageProps {
    if props.contains_key(IDENTITY_PROP_KEY) {
        warn!("page props already contain {IDENTITY_PROP_KEY}, overwriting with the resolved identity");
    }

    let serialized = serde_json::to_value(identity).unwrap_or(Value::Null);
    props.insert(IDENTITY_PROP_KEY.to_string(), serialized);
    props
}
