//! LLM provider implementations
//!
//! Every backend is reached through [`ProviderClient`], which owns the
//! shared parts of a call (token budget, HTTP, timeout, status
//! classification) and delegates the wire shape to one module per
//! provider.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use log::{debug, error, trace, warn};
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::Provider;

/// Anything that can turn a (system, user) prompt pair into raw text.
///
/// One call = one outbound request; implementations never retry.
#[async_trait]
pub trait Generate: Send + Sync
{   fn provider(&self) -> Provider;

    async fn generate(
      &self
    , system: &str
    , user: &str
    , word_count: u32
    ) -> Result<String>;
}

/// Provider-specific HTTP request, ready to send
#[derive(Debug, Clone)]
pub(crate) struct WireRequest
{   pub url: String
  , pub headers: Vec<(&'static str, String)>
  , pub body: serde_json::Value
}

/// HTTP-backed generator for one configured provider
pub struct ProviderClient
{   config: ProviderConfig
  , http_client: reqwest::Client
}

impl ProviderClient
{   pub fn new(config: ProviderConfig) -> Result<Self>
    {   if config.api_key.trim().is_empty()
        {   return Err(Error::MissingApiKey(config.provider.to_string()));
        }
        debug!(
          "Creating {} client for model {}",
          config.provider, config.model
        );
        let http_client = reqwest::Client::builder()
          .timeout(config.timeout())
          .build()
          .map_err(|e| Error::HttpError(e.to_string()))?;
        Ok(ProviderClient { config, http_client })
    }

    fn build_request(
      &self
    , system: &str
    , user: &str
    , max_tokens: u32
    ) -> Result<WireRequest>
    {   match self.config.provider
        {   Provider::OpenAI => {
              openai::build_request(&self.config, system, user, max_tokens)
            }
          , Provider::Gemini => {
              gemini::build_request(&self.config, system, user, max_tokens)
            }
          , Provider::Anthropic => {
              anthropic::build_request(
                &self.config, system, user, max_tokens
              )
            }
        }
    }

    fn extract_text(&self, body: &str) -> Result<String>
    {   match self.config.provider
        {   Provider::OpenAI => openai::extract_text(body)
          , Provider::Gemini => gemini::extract_text(body)
          , Provider::Anthropic => anthropic::extract_text(body)
        }
    }
}

#[async_trait]
impl Generate for ProviderClient
{   fn provider(&self) -> Provider
    {   self.config.provider
    }

    async fn generate(
      &self
    , system: &str
    , user: &str
    , word_count: u32
    ) -> Result<String>
    {   let provider = self.config.provider;
        let max_tokens
          = self.config.budget.max_output_tokens(word_count);
        debug!(
          "{} generate: model={} word_count={} max_tokens={}",
          provider, self.config.model, word_count, max_tokens
        );

        let wire = self.build_request(system, user, max_tokens)?;
        trace!("{} request: {}", provider, wire.body);

        let mut builder = self.http_client
          .post(&wire.url)
          .header("Content-Type", "application/json");
        for (name, value) in &wire.headers
        {   builder = builder.header(*name, value);
        }

        let response = builder
          .json(&wire.body)
          .send()
          .await
          .map_err(|e| {
            if e.is_timeout()
            {   warn!("{} request timed out", provider);
                Error::Timeout
                {   provider: provider.to_string()
                  , secs: self.config.timeout_secs
                }
            } else
            {   error!("{} HTTP error: {}", provider, e);
                Error::HttpError(format!("{}: {}", provider, e))
            }
          })?;

        let status = response.status();
        trace!("{} response status: {}", provider, status);

        let body = response.text().await.map_err(|e| {
          if e.is_timeout()
          {   Error::Timeout
              {   provider: provider.to_string()
                , secs: self.config.timeout_secs
              }
          } else
          {   Error::HttpError(format!("{}: {}", provider, e))
          }
        })?;

        if !status.is_success()
        {   let err = classify_failure(provider, status.as_u16(), &body);
            error!("{} API error: {}", provider, err);
            return Err(err);
        }

        trace!("{} response body: {}", provider, body);
        self.extract_text(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope
{   error: ErrorBody
}

#[derive(Debug, Deserialize)]
struct ErrorBody
{   #[serde(default)]
    message: Option<String>
  , #[serde(default)]
    status: Option<String>
}

fn mentions_quota(body: &str) -> bool
{   let lower = body.to_ascii_lowercase();
    ["insufficient_quota", "quota", "billing", "resource_exhausted"]
      .iter()
      .any(|needle| lower.contains(needle))
}

/// Map a non-2xx response to the most specific error kind
pub(crate) fn classify_failure(
  provider: Provider
, status: u16
, body: &str
) -> Error
{   let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope.as_ref()
      .and_then(|e| e.error.message.clone())
      .or_else(|| envelope.as_ref().and_then(|e| e.error.status.clone()))
      .unwrap_or_else(|| {
        let snippet: String = body.trim().chars().take(200).collect();
        if snippet.is_empty()
        {   format!("HTTP {}", status)
        } else
        {   snippet
        }
      });

    if status == 402
      || (matches!(status, 400 | 403 | 429) && mentions_quota(body))
    {   return Error::QuotaExceeded
        {   provider: provider.to_string()
          , message
        };
    }
    if status == 429
    {   return Error::RateLimitExceeded(provider.to_string());
    }
    Error::ApiError
    {   provider: provider.to_string()
      , status
      , message
    }
}

/// First candidate that still has text after trimming
pub(crate) fn first_text<I>(candidates: I) -> Option<String>
where I: IntoIterator<Item = Option<String>>
{   candidates.into_iter()
      .flatten()
      .find(|text| !text.trim().is_empty())
}

pub(crate) fn parse_body<'a, T>(provider: Provider, body: &'a str)
  -> Result<T>
where T: Deserialize<'a>
{   serde_json::from_str(body).map_err(|e| {
      error!("{} parse error: {}", provider, e);
      Error::ParseError(format!("{} response: {}", provider, e))
    })
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn insufficient_quota_is_quota()
    {   let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota"}}"#;
        assert_eq!(
          classify_failure(Provider::OpenAI, 429, body),
          Error::QuotaExceeded
          {   provider: "OpenAI".to_string()
            , message: "You exceeded your current quota".to_string()
          }
        );
    }

    #[test]
    fn plain_429_is_rate_limit()
    {   assert_eq!(
          classify_failure(Provider::Anthropic, 429, "slow down"),
          Error::RateLimitExceeded("Anthropic".to_string())
        );
    }

    #[test]
    fn other_status_keeps_message()
    {   let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
          classify_failure(Provider::Gemini, 400, body),
          Error::ApiError
          {   provider: "Gemini".to_string()
            , status: 400
            , message: "API key not valid".to_string()
          }
        );
        assert_eq!(
          classify_failure(Provider::Gemini, 503, ""),
          Error::ApiError
          {   provider: "Gemini".to_string()
            , status: 503
            , message: "HTTP 503".to_string()
          }
        );
    }

    #[test]
    fn first_text_skips_blank()
    {   assert_eq!(
          first_text(vec![None, Some("  ".to_string()), Some("hi".to_string())]),
          Some("hi".to_string())
        );
        assert_eq!(first_text(vec![None, Some(String::new())]), None);
    }

    #[test]
    fn empty_key_is_rejected()
    {   let config = ProviderConfig::new(Provider::OpenAI, " ");
        assert!(matches!(
          ProviderClient::new(config),
          Err(Error::MissingApiKey(_))
        ));
    }
}
