use async_stream::stream;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::{Config, TimeoutConfig};
use crate::error::{Error, Result};
use crate::options::LoadParams;

/// One row of the upstream model listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub id: String,

    #[serde(default)]
    pub recipe: String,

    #[serde(default = "default_true")]
    pub downloaded: bool,
}

fn default_true() -> bool {
    true
}

impl ModelEntry {
    /// Models backed by llama.cpp get the backend override input in the UI.
    pub fn uses_llamacpp(&self) -> bool {
        let recipe = self.recipe.to_lowercase();
        recipe.contains("llamacpp")
            || recipe.contains("gguf")
            || self.id.to_lowercase().contains("gguf")
    }
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

/// Upstream health report; loaded-ness of a model is derived by
/// membership in `all_models_loaded`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub model_loaded: Option<String>,

    #[serde(default)]
    pub all_models_loaded: Vec<LoadedModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadedModel {
    pub model_name: String,
}

impl Health {
    pub fn loaded_ids(&self) -> HashSet<&str> {
        self.all_models_loaded
            .iter()
            .map(|entry| entry.model_name.as_str())
            .collect()
    }
}

/// Parameters for a pull (download) request.
#[derive(Debug, Clone, Serialize)]
pub struct PullRequest {
    pub model_name: String,
    pub checkpoint: String,
    pub recipe: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mmproj: Option<String>,
}

#[derive(Serialize)]
struct LoadBody<'a> {
    model_name: &'a str,

    #[serde(flatten)]
    params: &'a LoadParams,
}

#[derive(Serialize)]
struct UnloadBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model_name: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    model_name: &'a str,
}

#[derive(Serialize)]
struct PullBody<'a> {
    #[serde(flatten)]
    request: &'a PullRequest,
    stream: bool,
}

/// Thin client for the Lemonade Server REST API.
///
/// Each operation carries its own timeout tier; the bearer credential,
/// when configured, is attached to every request.
pub struct LemonadeClient {
    base_url: String,
    api_key: Option<String>,
    timeouts: TimeoutConfig,
    http: reqwest::Client,
}

impl LemonadeClient {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.upstream.base_url.trim_end_matches('/').to_string(),
            api_key: config.upstream.api_key.clone(),
            timeouts: config.timeouts.clone(),
            http: reqwest::Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str, timeout: Duration) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(timeout);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    /// List of models known to the server, downloaded or not.
    pub async fn models(&self) -> Result<Vec<ModelEntry>> {
        let response = self
            .request(Method::GET, "/api/v1/models", self.timeouts.light)
            .send()
            .await
            .map_err(Error::UpstreamUnavailable)?;
        let response = check_status(response, "list models").await?;
        let body: ModelsResponse = response.json().await.map_err(Error::UpstreamUnavailable)?;
        Ok(body.data)
    }

    /// Server health, including which models are currently loaded.
    pub async fn health(&self) -> Result<Health> {
        let response = self
            .request(Method::GET, "/api/v1/health", self.timeouts.light)
            .send()
            .await
            .map_err(Error::UpstreamUnavailable)?;
        let response = check_status(response, "health").await?;
        response.json().await.map_err(Error::UpstreamUnavailable)
    }

    /// Stats are cosmetic; every failure collapses to "no stats".
    pub async fn stats(&self) -> Option<Value> {
        match self
            .request(Method::GET, "/api/v1/stats", self.timeouts.light)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response.json().await.ok(),
            Ok(response) => {
                tracing::debug!("stats returned {}", response.status());
                None
            }
            Err(err) => {
                tracing::debug!("stats unavailable: {}", err);
                None
            }
        }
    }

    /// Load a model; only set fields of `params` end up in the body.
    pub async fn load(&self, model: &str, params: &LoadParams) -> Result<()> {
        let response = self
            .request(Method::POST, "/api/v1/load", self.timeouts.load)
            .json(&LoadBody {
                model_name: model,
                params,
            })
            .send()
            .await
            .map_err(Error::UpstreamUnavailable)?;
        check_status(response, "load").await?;
        Ok(())
    }

    /// Unload one model, or everything when no model is given.
    pub async fn unload(&self, model: Option<&str>) -> Result<()> {
        let response = self
            .request(Method::POST, "/api/v1/unload", self.timeouts.light)
            .json(&UnloadBody { model_name: model })
            .send()
            .await
            .map_err(Error::UpstreamUnavailable)?;
        check_status(response, "unload").await?;
        Ok(())
    }

    /// Delete a model's files; the server unloads it first if running.
    pub async fn delete(&self, model: &str) -> Result<()> {
        let response = self
            .request(Method::POST, "/api/v1/delete", self.timeouts.light)
            .json(&DeleteBody { model_name: model })
            .send()
            .await
            .map_err(Error::UpstreamUnavailable)?;
        check_status(response, "delete").await?;
        Ok(())
    }

    /// Start a pull and relay the upstream SSE bytes without buffering.
    ///
    /// The stream itself never fails: an upstream error before or during
    /// the transfer becomes a single terminal `data:` event carrying an
    /// `error` payload, so a browser reading the relay always gets a
    /// displayable signal instead of a dropped connection. Dropping the
    /// stream aborts the upstream call.
    pub fn pull(&self, request: PullRequest) -> impl Stream<Item = Bytes> + Send + 'static {
        let builder = self
            .request(Method::POST, "/api/v1/pull", self.timeouts.pull)
            .json(&PullBody {
                request: &request,
                stream: true,
            });

        stream! {
            let response = match builder.send().await {
                Ok(response) => response,
                Err(err) => {
                    yield error_event(&format!("cannot reach lemonade server: {}", err));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                yield error_event(&format!("upstream error {}: {}", status, body));
                return;
            }

            let mut chunks = response.bytes_stream();
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(bytes) => yield bytes,
                    Err(err) => {
                        yield error_event(&format!("stream interrupted: {}", err));
                        return;
                    }
                }
            }
        }
    }
}

/// One well-formed SSE event with an error payload.
fn error_event(message: &str) -> Bytes {
    let payload = serde_json::json!({ "error": message });
    Bytes::from(format!("data: {}\n\n", payload))
}

async fn check_status(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::UpstreamRejected {
        operation,
        status,
        body,
    })
}
