//! Crate-wide error type and its mapping to caller-facing outcomes

use thiserror::Error;

/// Custom error type for essay generation
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error
{   /// No provider credential is configured at all
    #[error("No LLM provider configured: set OPENAI_API_KEY, GEMINI_API_KEY or ANTHROPIC_API_KEY")]
    NoProviderConfigured
  , /// API key is missing for a provider
    #[error("Missing API key for: {0}")]
    MissingApiKey(String)
  , /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String)
  , /// Request failed validation before reaching a provider
    #[error("Invalid request: {0}")]
    InvalidRequest(String)
  , /// HTTP transport error
    #[error("HTTP error: {0}")]
    HttpError(String)
  , /// Provider call exceeded its time budget
    #[error("{provider} request timed out after {secs}s")]
    Timeout
    {   provider: String
      , secs: u64
    }
  , /// API returned a non-success response
    #[error("{provider} API error ({status}): {message}")]
    ApiError
    {   provider: String
      , status: u16
      , message: String
    }
  , /// Rate limit exceeded
    #[error("{0} rate limit exceeded")]
    RateLimitExceeded(String)
  , /// Quota or billing exhausted
    #[error("{provider} quota exceeded: {message}")]
    QuotaExceeded
    {   provider: String
      , message: String
    }
  , /// Provider refused or filtered the request
    #[error("{provider} blocked the request: {reason}")]
    ContentBlocked
    {   provider: String
      , reason: String
    }
  , /// 2xx response without any extractable text
    #[error("{0} returned no essay content")]
    EmptyGeneration(String)
  , /// Failed to parse API response
    #[error("Parse error: {0}")]
    ParseError(String)
  , /// The word-count corrective pass failed
    #[error("Word count correction failed: {0}")]
    CorrectionFailed(String)
  , /// Generic error
    #[error("Error: {0}")]
    Other(String)
}

/// Coarse failure classes the HTTP layer maps to status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind
{   Configuration
  , InvalidRequest
  , Quota
  , Blocked
  , Provider
}

impl FailureKind
{   /// HTTP status the request boundary should answer with
    pub fn status_code(self) -> u16
    {   match self
        {   FailureKind::Configuration => 500
          , FailureKind::InvalidRequest => 400
          , FailureKind::Quota => 429
          , FailureKind::Blocked => 502
          , FailureKind::Provider => 502
        }
    }
}

impl Error
{   pub fn kind(&self) -> FailureKind
    {   match self
        {   Error::NoProviderConfigured
          | Error::MissingApiKey(_)
          | Error::InvalidConfiguration(_) => FailureKind::Configuration
          , Error::InvalidRequest(_) => FailureKind::InvalidRequest
          , Error::RateLimitExceeded(_)
          | Error::QuotaExceeded { .. } => FailureKind::Quota
          , Error::ContentBlocked { .. } => FailureKind::Blocked
          , Error::CorrectionFailed(_)
          | Error::HttpError(_)
          | Error::Timeout { .. }
          | Error::ApiError { .. }
          | Error::EmptyGeneration(_)
          | Error::ParseError(_)
          | Error::Other(_) => FailureKind::Provider
        }
    }

    /// Single human-readable message per failure kind.
    /// Never includes provider payloads.
    pub fn user_message(&self) -> String
    {   match self
        {   Error::NoProviderConfigured
          | Error::MissingApiKey(_)
          | Error::InvalidConfiguration(_) => {
              "API configuration error. Please check your environment variables."
                .to_string()
            }
          , Error::InvalidRequest(msg) => msg.clone()
          , Error::QuotaExceeded { .. } => {
              "API quota exceeded. Please check your API billing status."
                .to_string()
            }
          , Error::RateLimitExceeded(_) => {
              "The text generation service is rate limiting requests. Please try again shortly."
                .to_string()
            }
          , Error::ContentBlocked { provider, reason } => {
              format!(
                "{} declined to generate this essay ({}). Try rephrasing the topic or switching providers.",
                provider, reason
              )
            }
          , _ => "Failed to generate essay".to_string()
        }
    }

    /// Whether another provider may still succeed where this one failed
    pub fn is_retryable_elsewhere(&self) -> bool
    {   !matches!(
          self,
          Error::NoProviderConfigured
            | Error::InvalidConfiguration(_)
            | Error::InvalidRequest(_)
        )
    }

    /// How much actionable detail the error carries; used to pick which
    /// failure to surface when every provider failed.
    pub(crate) fn specificity(&self) -> u8
    {   match self
        {   Error::NoProviderConfigured
          | Error::MissingApiKey(_)
          | Error::InvalidConfiguration(_)
          | Error::InvalidRequest(_) => 7
          , Error::QuotaExceeded { .. } => 6
          , Error::ContentBlocked { .. } => 5
          , Error::RateLimitExceeded(_) => 4
          , Error::ApiError { .. } => 3
          , Error::EmptyGeneration(_) => 2
          , Error::Timeout { .. }
          | Error::HttpError(_)
          | Error::ParseError(_)
          | Error::CorrectionFailed(_)
          | Error::Other(_) => 1
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn quota_maps_to_429()
    {   let err = Error::QuotaExceeded
        {   provider: "OpenAI".to_string()
          , message: "insufficient_quota".to_string()
        };
        assert_eq!(err.kind(), FailureKind::Quota);
        assert_eq!(err.kind().status_code(), 429);
        assert!(!err.user_message().contains("insufficient_quota"));
    }

    #[test]
    fn configuration_is_not_retryable()
    {   assert!(!Error::NoProviderConfigured.is_retryable_elsewhere());
        assert_eq!(
          Error::NoProviderConfigured.kind().status_code(),
          500
        );
        assert!(
          Error::HttpError("reset".into()).is_retryable_elsewhere()
        );
    }

    #[test]
    fn blocked_message_names_reason()
    {   let err = Error::ContentBlocked
        {   provider: "Gemini".to_string()
          , reason: "SAFETY".to_string()
        };
        assert!(err.user_message().contains("SAFETY"));
        assert!(err.user_message().contains("switching providers"));
    }
}
