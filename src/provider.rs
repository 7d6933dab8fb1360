//! Identity provider client.
//!
//! The provider owns token cryptography and key material; this crate only
//! consumes the narrow verify/refresh surface. [`HttpIdentityProvider`]
//! talks to a remote token authority; tests inject scripted
//! implementations of [`IdentityProvider`] instead.

use std::{future::Future, pin::Pin};

use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, instrument};
use url::Url;

use crate::identity::Claims;
use crate::APP_USER_AGENT;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid provider base url: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Client surface of the identity provider.
///
/// `verify_id_token` validates an id token and returns its claims;
/// `refresh_id_token` exchanges a refresh token for a newly minted id
/// token.
pub trait IdentityProvider: Send + Sync {
    fn verify_id_token<'a>(
        &'a self,
        id_token: &'a str,
    ) -> BoxFuture<'a, Result<Claims, ProviderError>>;

    fn refresh_id_token<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<String, ProviderError>>;
}

/// HTTP implementation of [`IdentityProvider`].
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    verify_url: String,
    refresh_url: String,
}

impl HttpIdentityProvider {
    /// Build a client for the token authority at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let base = Url::parse(base_url)?;
        let base = base.as_str().trim_end_matches('/').to_string();

        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            client,
            verify_url: format!("{base}/v1/token/verify"),
            refresh_url: format!("{base}/v1/token/refresh"),
        })
    }

    #[instrument(skip(self, id_token))]
    async fn verify(&self, id_token: &str) -> Result<Claims, ProviderError> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&json!({ "idToken": id_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["errors"][0].as_str().unwrap_or_default();

            error!("Token verification rejected: {status} {message}");

            return Err(ProviderError::Rejected(format!("{status}, {message}")));
        }

        let body: Value = response.json().await?;
        body["claims"].as_object().map_or_else(
            || {
                error!("Provider verify response carried no claims");

                Err(ProviderError::MalformedResponse(
                    "no claims in response".to_string(),
                ))
            },
            |claims| Ok(claims.clone()),
        )
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.refresh_url)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["errors"][0].as_str().unwrap_or_default();

            error!("Token refresh rejected: {status} {message}");

            return Err(ProviderError::Rejected(format!("{status}, {message}")));
        }

        let body: Value = response.json().await?;
        body["idToken"].as_str().map_or_else(
            || {
                error!("Provider refresh response carried no id token");

                Err(ProviderError::MalformedResponse(
                    "no idToken in response".to_string(),
                ))
            },
            |token| Ok(token.to_string()),
        )
    }
}

impl IdentityProvider for HttpIdentityProvider {
    fn verify_id_token<'a>(
        &'a self,
        id_token: &'a str,
    ) -> BoxFuture<'a, Result<Claims, ProviderError>> {
        Box::pin(self.verify(id_token))
    }

    fn refresh_id_token<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(self.refresh(refresh_token))
    }
}
