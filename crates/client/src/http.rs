//! reqwest-backed store API client.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use storetrack_core::{OperationDescriptor, OperationKind, StatusResponse, TrackingHandle};
use tracing::{debug, warn};

use crate::api::StoreApi;
use crate::config::{Auth, ClientConfig};
use crate::envelope::{Envelope, ErrorEnvelope, TriggerResponse};
use crate::error::{ApiError, Result};

/// Longest error body kept in [`ApiError::Http`].
const MAX_ERROR_BODY: usize = 512;

/// Store API client talking to a ServiceNow instance.
#[derive(Clone)]
pub struct HttpStoreApi {
    /// HTTP client
    client: Client,

    /// Endpoint and credential settings
    config: ClientConfig,
}

impl HttpStoreApi {
    /// Create a client for `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Url::parse(&config.base_url)
            .map_err(|e| ApiError::Config(format!("base_url {:?}: {}", config.base_url, e)))?;

        let client = ClientBuilder::new()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { client, config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL of the trigger endpoint for `kind`.
    pub fn trigger_url(&self, kind: OperationKind) -> String {
        match kind {
            OperationKind::Install => self.config.endpoint(&self.config.install_path),
            OperationKind::Update => self.config.endpoint(&self.config.update_path),
        }
    }

    /// URL of the status endpoint for `handle`, with the handle as a single
    /// escaped path segment.
    pub fn status_url(&self, handle: &TrackingHandle) -> Result<Url> {
        let base = self.config.endpoint(&self.config.progress_path);
        let mut url = Url::parse(&base)
            .map_err(|e| ApiError::Config(format!("progress url {:?}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("progress url {:?} cannot have a path", base)))?
            .pop_if_empty()
            .push(handle.as_str());
        Ok(url)
    }

    /// JSON body sent to the trigger endpoint.
    ///
    /// Extra options go in first so they cannot override the fixed fields.
    pub fn request_body(descriptor: &OperationDescriptor) -> Value {
        let mut body = descriptor.options.extra.clone();
        body.insert("appId".to_string(), json!(descriptor.item_id.trim()));
        if let Some(version) = descriptor.version.as_deref().map(str::trim) {
            if !version.is_empty() {
                body.insert("version".to_string(), json!(version));
            }
        }
        body.insert(
            "loadDemoData".to_string(),
            json!(descriptor.options.load_demo_data),
        );
        Value::Object(body)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match &self.config.auth {
            Auth::None => request,
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Bearer { token } => request.bearer_auth(token),
        }
    }

    /// Check the status code and decode an enveloped JSON body.
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let mut body = ErrorEnvelope::message_from(&text).unwrap_or(text);
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.into_inner())
    }
}

#[async_trait]
impl StoreApi for HttpStoreApi {
    async fn trigger(&self, descriptor: &OperationDescriptor) -> Result<TrackingHandle> {
        descriptor.validate()?;

        let url = self.trigger_url(descriptor.kind);
        debug!(
            item_id = %descriptor.item_id,
            kind = %descriptor.kind,
            %url,
            "Triggering store operation"
        );

        let response = self
            .authorize(self.client.post(&url))
            .json(&Self::request_body(descriptor))
            .send()
            .await?;

        let body: TriggerResponse = Self::read_json(response).await.map_err(|e| {
            warn!(item_id = %descriptor.item_id, error = %e, "Trigger request failed");
            e
        })?;

        body.tracking_id
            .and_then(TrackingHandle::new)
            .ok_or_else(|| ApiError::InvalidResponse("missing trackingId".to_string()))
    }

    async fn status(&self, handle: &TrackingHandle) -> Result<StatusResponse> {
        let url = self.status_url(handle)?;
        let response = self.authorize(self.client.get(url)).send().await?;
        Self::read_json(response).await
    }
}
