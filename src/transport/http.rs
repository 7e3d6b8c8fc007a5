use std::time::Duration;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use log::{debug, error, trace};

use crate::request::{
  HealthStatus, LlmRequest, ModelList, PlatformList, ProcessResult,
};
use super::ProcessorTransport;

/// Error body shape used by HTTP front-ends (`{"detail": "..."}`)
#[derive(Debug, Clone, Deserialize)]
struct ErrorDetail
{   detail: serde_json::Value
}

/// Request processor reached over HTTP
pub struct HttpTransport
{   name: String
  , base_url: String
  , http_client: reqwest::Client
}

impl HttpTransport
{   pub fn new(name: &str, base_url: &str) -> Self
    {   debug!("Creating HttpTransport {} -> {}", name, base_url);
        HttpTransport
        {   name: name.to_string()
          , base_url: base_url.trim().trim_end_matches('/').to_string()
          , http_client: reqwest::Client::new()
        }
    }

    pub fn base_url(&self) -> &str
    {   &self.base_url
    }

    fn url(&self, path: &str) -> String
    {   format!("{}/{}", self.base_url, path)
    }

    fn map_send_error(
      &self
    , err: reqwest::Error
    , timeout: Duration
    ) -> crate::error::Error
    {   if err.is_timeout()
        {   error!("{} timed out after {:?}", self.name, timeout);
            return crate::error::Error::UpstreamTimeout
            {   upstream: self.name.clone()
              , timeout_ms: timeout.as_millis() as u64
            };
        }
        error!("HTTP error talking to {}: {}", self.name, err);
        crate::error::Error::UpstreamUnavailable(
          format!("{} ({}): {}", self.name, self.base_url, err)
        )
    }

    /// Read a whole body, keeping timeouts distinguishable
    async fn read_body(
      &self
    , response: reqwest::Response
    , timeout: Duration
    ) -> Result<(u16, String), crate::error::Error>
    {   let status = response.status().as_u16();
        trace!("{} response status: {}", self.name, status);
        let body = response.text().await.map_err(|e| {
          if e.is_timeout()
          {   self.map_send_error(e, timeout)
          } else
          {   error!("Failed reading body from {}: {}", self.name, e);
              crate::error::Error::ParseError(e.to_string())
          }
        })?;
        Ok((status, body))
    }

    async fn get_json<T: DeserializeOwned>(
      &self
    , path: &str
    , timeout: Duration
    ) -> Result<T, crate::error::Error>
    {   let response = self.http_client
          .get(self.url(path))
          .timeout(timeout)
          .send()
          .await
          .map_err(|e| self.map_send_error(e, timeout))?;

        let (status, body) = self.read_body(response, timeout).await?;
        if !(200..300).contains(&status)
        {   error!("{} /{} answered {}", self.name, path, status);
            return Err(crate::error::Error::UpstreamError
            {   status
              , message: error_message(&body)
            });
        }

        serde_json::from_str(&body).map_err(|e| {
          error!("Parse error from {} /{}: {}", self.name, path, e);
          crate::error::Error::ParseError(e.to_string())
        })
    }
}

/// Pull a readable message out of an error body
fn error_message(body: &str) -> String
{   match serde_json::from_str::<ErrorDetail>(body)
    {   Ok(ErrorDetail { detail: serde_json::Value::String(s) }) => s
      , Ok(ErrorDetail { detail }) => detail.to_string()
      , Err(_) if body.trim().is_empty() => "Unknown error".to_string()
      , Err(_) => body.to_string()
    }
}

#[async_trait]
impl ProcessorTransport for HttpTransport
{   fn name(&self) -> &str
    {   &self.name
    }

    async fn process(
      &self
    , request: &LlmRequest
    , timeout: Duration
    ) -> Result<ProcessResult, crate::error::Error>
    {   debug!("POST {}/process (timeout {:?})", self.base_url, timeout);
        trace!("Process payload: {:?}", request);

        let response = self.http_client
          .post(self.url("process"))
          .header("Content-Type", "application/json")
          .json(request)
          .timeout(timeout)
          .send()
          .await
          .map_err(|e| self.map_send_error(e, timeout))?;

        let (status, body) = self.read_body(response, timeout).await?;

        // A processor result is relayed whatever the HTTP status says,
        // so validation rejections pass through untouched.
        if let Ok(result) = serde_json::from_str::<ProcessResult>(&body)
        {   trace!("{} returned result {}", self.name, result.request_id);
            return Ok(result);
        }

        if !(200..300).contains(&status)
        {   let message = error_message(&body);
            error!("{} process failed ({}): {}", self.name, status, message);
            return Err(crate::error::Error::UpstreamError
            {   status
              , message
            });
        }

        error!("{} returned an unrecognized body", self.name);
        Err(crate::error::Error::ParseError(
          format!("unrecognized process response from {}", self.name)
        ))
    }

    async fn health(
      &self
    , timeout: Duration
    ) -> Result<HealthStatus, crate::error::Error>
    {   self.get_json("health", timeout).await
    }

    async fn supported_models(
      &self
    , timeout: Duration
    ) -> Result<ModelList, crate::error::Error>
    {   self.get_json("models", timeout).await
    }

    async fn supported_platforms(
      &self
    , timeout: Duration
    ) -> Result<PlatformList, crate::error::Error>
    {   self.get_json("platforms", timeout).await
    }
}
