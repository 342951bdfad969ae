//! # sbs-client
//!
//! Async HTTP client for the SmileBASIC Source API.
//!
//! Wraps the three endpoints the data model needs:
//! - `GET user/me` for the authenticated user
//! - `POST read/chain` for heterogeneous bundles
//! - `GET read/listen` for long-poll activity
//!
//! Responses are decoded per record through `sbs-core`, so one malformed
//! record never fails a whole request. [`ListenSession`] drives the listen
//! loop and owns the resume state.

mod error;
mod http;
mod session;

pub use error::ClientError;
pub use session::ListenSession;

use std::time::Duration;

use sbs_config::{ApiConfig, DecodeConfig, SbsConfig};
use sbs_core::bundle::Bundle;
use sbs_core::contract::ValidationContext;
use sbs_core::decode::decode_record;
use sbs_core::entities::UserSelf;
use sbs_core::listen::{ActionQuery, ListenResponse, ListenerQuery, RawListenResponse};
use sbs_core::search::ChainQuery;
use serde_json::Value;

use crate::http::{check_response, read_json};

/// HTTP client for the SmileBASIC Source API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api: ApiConfig,
    decode: DecodeConfig,
    poll_timeout: Duration,
}

impl ApiClient {
    /// Build a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the configuration is invalid, or
    /// [`ClientError::Http`] if the underlying `reqwest::Client` fails to
    /// build.
    pub fn new(config: &SbsConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(config.api.user_agent.clone())
            .timeout(config.api.timeout())
            .build()?;
        Ok(Self {
            http,
            api: config.api.clone(),
            decode: config.decode.clone(),
            poll_timeout: config.listen.poll_timeout(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.api.base_url
    }

    /// A validation context anchored at the current time.
    fn context(&self) -> ValidationContext {
        self.decode.validation_context()
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api.has_token() {
            request.bearer_auth(self.api.token.trim())
        } else {
            request
        }
    }

    /// Fetch the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] without a valid token, or
    /// [`ClientError::Parse`] if the record does not decode.
    pub async fn me(&self) -> Result<UserSelf, ClientError> {
        let url = self.api.endpoint("user/me");
        tracing::debug!(%url, "fetching current user");
        let resp = check_response(self.authorize(self.http.get(&url)).send().await?).await?;
        let value: Value = read_json(resp).await?;

        let decoded = decode_record::<UserSelf>(value, &self.context())
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        for violation in &decoded.violations {
            tracing::warn!(?violation, "current user breaks the data contract");
        }
        Ok(decoded.into_inner())
    }

    /// Read a set of requests in one call and decode the resulting bundle.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure, a non-success status,
    /// or a body that is not a bundle object.
    pub async fn read_chain(&self, query: &ChainQuery) -> Result<Bundle, ClientError> {
        let url = self.api.endpoint("read/chain");
        tracing::debug!(%url, requests = query.requests.len(), "reading chain");
        let resp =
            check_response(self.authorize(self.http.post(&url)).json(query).send().await?).await?;
        let value: Value = read_json(resp).await?;

        let bundle = Bundle::from_value(value, &self.context())
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        if !bundle.failures().is_empty() {
            tracing::warn!(
                failures = bundle.failures().len(),
                "chain read returned records that did not decode"
            );
        }
        Ok(bundle)
    }

    /// Issue one long-poll listen request.
    ///
    /// Suspends until the server has new activity or presence, or the poll
    /// timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PollTimeout`] if the poll ended without data;
    /// re-issue it with the same queries.
    pub async fn listen(
        &self,
        actions: &ActionQuery,
        listeners: &ListenerQuery,
    ) -> Result<ListenResponse, ClientError> {
        let url = self.listen_url(actions, listeners)?;
        tracing::debug!(last_id = actions.last_id, chains = ?actions.chains, "listening");

        let sent = self
            .authorize(self.http.get(&url))
            .timeout(self.poll_timeout)
            .send()
            .await;
        let resp = match sent {
            Ok(resp) => check_response(resp).await?,
            Err(e) if e.is_timeout() => return Err(ClientError::PollTimeout),
            Err(e) => return Err(e.into()),
        };
        let raw: RawListenResponse = read_json(resp).await?;
        Ok(ListenResponse::decode(raw, &self.context()))
    }

    fn listen_url(
        &self,
        actions: &ActionQuery,
        listeners: &ListenerQuery,
    ) -> Result<String, ClientError> {
        let actions =
            serde_json::to_string(actions).map_err(|e| ClientError::Parse(e.to_string()))?;
        let listeners =
            serde_json::to_string(listeners).map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(format!(
            "{}?actions={}&listeners={}",
            self.api.endpoint("read/listen"),
            urlencoding::encode(&actions),
            urlencoding::encode(&listeners)
        ))
    }
}
