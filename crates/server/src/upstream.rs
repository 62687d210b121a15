//! HTTP client for the external ML prediction service.

use crate::scratch::ScratchFile;
use axum::http::StatusCode;
use optipredict_core::config::MlServiceConfig;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use tokio_util::io::ReaderStream;

/// ML client errors.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Connection refused, DNS failure, or similar.
    #[error("ML service unreachable: {0}")]
    Unavailable(String),

    #[error("ML service did not answer within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("ML service response exceeds {limit} bytes")]
    ResponseTooLarge { limit: u64 },

    #[error("invalid ML service URL: {0}")]
    Url(String),

    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("ML service request failed: {0}")]
    Request(String),
}

impl UpstreamError {
    fn classify(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// A raw reply from the ML service.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: String,
}

impl UpstreamReply {
    /// The `message` field of a JSON error body, if there is one.
    pub fn message(&self) -> Option<String> {
        serde_json::from_str::<Value>(&self.body)
            .ok()?
            .get("message")?
            .as_str()
            .map(str::to_string)
    }
}

/// Client for the ML service endpoints.
#[derive(Debug, Clone)]
pub struct MlClient {
    http: reqwest::Client,
    base_url: Url,
    max_relay_bytes: u64,
    predict_timeout: Duration,
    query_timeout: Duration,
}

impl MlClient {
    pub fn new(config: &MlServiceConfig) -> Result<Self, UpstreamError> {
        // A trailing slash keeps any path prefix when joining endpoint paths.
        let base_url = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))
            .map_err(|e| UpstreamError::Url(e.to_string()))?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| UpstreamError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            max_relay_bytes: config.max_relay_bytes,
            predict_timeout: config.predict_timeout(),
            query_timeout: config.query_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn max_relay_bytes(&self) -> u64 {
        self.max_relay_bytes
    }

    fn url(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| UpstreamError::Url(e.to_string()))
    }

    /// Relay a stored upload to `POST /predict-file`.
    ///
    /// The file is streamed from disk. Any status is accepted; the caller
    /// decides what a 4xx/5xx means.
    pub async fn predict_file(
        &self,
        file: &ScratchFile,
        user_id: i64,
        timeout: Duration,
    ) -> Result<UpstreamReply, UpstreamError> {
        let handle = tokio::fs::File::open(file.path()).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(handle));
        let part = Part::stream_with_length(body, file.size())
            .file_name(file.original_name().to_string())
            .mime_str(file.content_type())
            .map_err(|e| UpstreamError::Request(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("user_id", user_id.to_string());

        let request = self
            .http
            .post(self.url("predict-file")?)
            .multipart(form)
            .timeout(timeout);
        self.send(request, timeout).await
    }

    /// Forward a manual prediction to `POST /predict`.
    pub async fn predict(&self, payload: &Value) -> Result<UpstreamReply, UpstreamError> {
        let request = self
            .http
            .post(self.url("predict")?)
            .json(payload)
            .timeout(self.predict_timeout);
        self.send(request, self.predict_timeout).await
    }

    /// `GET /predictions/{user_id}`.
    pub async fn predictions(&self, user_id: i64) -> Result<UpstreamReply, UpstreamError> {
        let url = self.url(&format!("predictions/{user_id}"))?;
        self.query(self.http.get(url)).await
    }

    /// `GET /predictions/count/{user_id}`.
    pub async fn prediction_count(&self, user_id: i64) -> Result<UpstreamReply, UpstreamError> {
        let url = self.url(&format!("predictions/count/{user_id}"))?;
        self.query(self.http.get(url)).await
    }

    /// `DELETE /predictions/all/{user_id}`.
    pub async fn delete_predictions(&self, user_id: i64) -> Result<UpstreamReply, UpstreamError> {
        let url = self.url(&format!("predictions/all/{user_id}"))?;
        self.query(self.http.delete(url)).await
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<UpstreamReply, UpstreamError> {
        let url = self.url("health")?;
        self.query(self.http.get(url)).await
    }

    async fn query(&self, request: reqwest::RequestBuilder) -> Result<UpstreamReply, UpstreamError> {
        self.send(request.timeout(self.query_timeout), self.query_timeout)
            .await
    }

    /// Send a request and read the body, bounded by the relay size limit.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<UpstreamReply, UpstreamError> {
        let mut response = request
            .send()
            .await
            .map_err(|e| UpstreamError::classify(e, timeout))?;
        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);

        if let Some(declared) = response.content_length()
            && declared > self.max_relay_bytes
        {
            return Err(UpstreamError::ResponseTooLarge {
                limit: self.max_relay_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| UpstreamError::classify(e, timeout))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_relay_bytes {
                return Err(UpstreamError::ResponseTooLarge {
                    limit: self.max_relay_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(UpstreamReply {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
