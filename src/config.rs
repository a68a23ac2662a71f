//! Configuration for providers, failover order and word-count control
//!
//! Everything here is built once per process (usually through
//! [`EssayConfig::from_env`]) and then only read.

use std::time::Duration;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::Provider;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Word-to-token heuristic used to size the output budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenBudget
{   /// Tokens assumed per requested word
    pub tokens_per_word: f64
  , /// Fixed headroom for outline, headings and references
    pub buffer_tokens: u32
  , /// Hard ceiling accepted by the provider
    pub max_tokens: u32
}

impl TokenBudget
{   pub fn for_provider(provider: &Provider) -> Self
    {   match provider
        {   Provider::OpenAI => TokenBudget
            {   tokens_per_word: 1.5
              , buffer_tokens: 500
              , max_tokens: 4096
            }
          , Provider::Gemini => TokenBudget
            {   tokens_per_word: 2.0
              , buffer_tokens: 1000
              , max_tokens: 8192
            }
          , Provider::Anthropic => TokenBudget
            {   tokens_per_word: 1.5
              , buffer_tokens: 500
              , max_tokens: 8192
            }
        }
    }

    /// Output token cap for an essay of `word_count` words
    pub fn max_output_tokens(&self, word_count: u32) -> u32
    {   let scaled
          = (word_count as f64 * self.tokens_per_word).ceil() as u32;
        scaled
          .saturating_add(self.buffer_tokens)
          .min(self.max_tokens)
    }
}

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig
{   /// Which backend this entry talks to
    pub provider: Provider
  , /// Secret credential; never serialized
    #[serde(skip_serializing, default)]
    pub api_key: String
  , /// Model identifier
    pub model: String
  , /// API base URL (if custom)
    pub api_base: Option<String>
  , /// Request timeout in seconds
    pub timeout_secs: u64
  , /// Output token sizing
    pub budget: TokenBudget
  , /// Sampling temperature
    pub temperature: f32
  , /// Gemini harm-block threshold (e.g. "BLOCK_ONLY_HIGH")
    pub safety_threshold: Option<String>
}

impl ProviderConfig
{   pub fn new(provider: Provider, api_key: impl Into<String>) -> Self
    {   ProviderConfig
        {   model: provider.default_model().to_string()
          , budget: TokenBudget::for_provider(&provider)
          , provider
          , api_key: api_key.into()
          , api_base: None
          , timeout_secs: DEFAULT_TIMEOUT_SECS
          , temperature: 0.7
          , safety_threshold: None
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self
    {   self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self
    {   self.api_base = Some(api_base.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self
    {   self.timeout_secs = timeout_secs;
        self
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str
    {   match &self.api_base
        {   Some(base) => base.trim_end_matches('/')
          , None => match self.provider
            {   Provider::OpenAI => OPENAI_API_BASE
              , Provider::Gemini => GEMINI_API_BASE
              , Provider::Anthropic => ANTHROPIC_API_BASE
            }
        }
    }

    pub fn timeout(&self) -> Duration
    {   Duration::from_secs(self.timeout_secs)
    }
}

/// What to do when the word-count corrective call fails
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize
)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionFailurePolicy
{   /// Keep the uncorrected essay
    #[default]
    ReturnOriginal
  , /// Fail the whole job
    Propagate
}

impl std::str::FromStr for CorrectionFailurePolicy
{   type Err = Error;

    fn from_str(s: &str) -> Result<Self>
    {   match s.trim().to_ascii_lowercase().as_str()
        {   "return-original" | "soft" => {
              Ok(CorrectionFailurePolicy::ReturnOriginal)
            }
          , "propagate" | "hard" => Ok(CorrectionFailurePolicy::Propagate)
          , other => Err(Error::InvalidConfiguration(
              format!("unknown correction failure policy: {}", other)
            ))
        }
    }
}

/// Word-count convergence configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceConfig
{   /// Accepted relative deviation from the target (0.1 = ±10%)
    pub tolerance: f64
  , pub correction_failure: CorrectionFailurePolicy
}

impl ConvergenceConfig
{   /// Replace the tolerance; must lie in `[0, 1)`
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self>
    {   if !(0.0..1.0).contains(&tolerance)
        {   return Err(Error::InvalidConfiguration(
              format!("tolerance must be in [0, 1): {}", tolerance)
            ));
        }
        self.tolerance = tolerance;
        Ok(self)
    }
}

impl Default for ConvergenceConfig
{   fn default() -> Self
    {   ConvergenceConfig
        {   tolerance: 0.1
          , correction_failure: CorrectionFailurePolicy::default()
        }
    }
}

/// Outline/essay splitter tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig
{   /// Lines longer than this (in chars) that are not bullets start the essay
    pub prose_threshold: usize
}

impl Default for ParserConfig
{   fn default() -> Self
    {   ParserConfig { prose_threshold: 30 }
    }
}

/// Essay generation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EssayConfig
{   /// Providers in failover order; the first is the primary
    pub providers: Vec<ProviderConfig>
  , pub convergence: ConvergenceConfig
  , pub parser: ParserConfig
}

impl EssayConfig
{   /// Read configuration from the process environment
    pub fn from_env() -> Result<Self>
    {   Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from any name -> value lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where F: Fn(&str) -> Option<String>
    {   let get = |name: &str| {
          lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        };

        let timeout_secs = match get("ESSAY_PROVIDER_TIMEOUT_SECS")
        {   Some(raw) => raw.parse::<u64>().map_err(|_| {
              Error::InvalidConfiguration(format!(
                "ESSAY_PROVIDER_TIMEOUT_SECS is not a number: {}",
                raw
              ))
            })?
          , None => DEFAULT_TIMEOUT_SECS
        };

        let mut providers = Vec::new();
        for provider in Provider::all()
        {   let key = get(provider.key_var());
            debug!(
              "Environment check: {:?} has_key={}",
              provider, key.is_some()
            );
            let Some(key) = key else { continue };

            let model_override = match provider
            {   Provider::OpenAI => {
                  get("OPENAI_MODEL").or_else(|| get("MODEL_FALLBACK"))
                }
              , Provider::Gemini => get("GEMINI_MODEL")
              , Provider::Anthropic => get("ANTHROPIC_MODEL")
            };

            let mut config = ProviderConfig::new(provider, key)
              .with_timeout_secs(timeout_secs);
            if let Some(model) = model_override
            {   config = config.with_model(model);
            }
            if provider == Provider::Gemini
            {   config.safety_threshold = get("GEMINI_SAFETY_THRESHOLD");
            }
            providers.push(config);
        }

        if let Some(raw) = get("ESSAY_PRIMARY_PROVIDER")
        {   let primary: Provider = raw.parse()?;
            promote(&mut providers, primary)?;
        }

        let mut convergence = ConvergenceConfig::default();
        if let Some(raw) = get("ESSAY_WORD_TOLERANCE")
        {   let tolerance: f64 = raw.parse().map_err(|_| {
              Error::InvalidConfiguration(
                format!("ESSAY_WORD_TOLERANCE is not a number: {}", raw)
              )
            })?;
            convergence = convergence.with_tolerance(tolerance)?;
        }
        if let Some(raw) = get("ESSAY_CORRECTION_FAILURE")
        {   convergence.correction_failure = raw.parse()?;
        }

        let mut parser = ParserConfig::default();
        if let Some(raw) = get("ESSAY_PROSE_THRESHOLD")
        {   parser.prose_threshold = raw.parse().map_err(|_| {
              Error::InvalidConfiguration(format!(
                "ESSAY_PROSE_THRESHOLD is not a number: {}",
                raw
              ))
            })?;
        }

        info!(
          "Loaded configuration with providers: {:?}",
          providers.iter().map(|p| p.provider).collect::<Vec<_>>()
        );
        Ok(EssayConfig { providers, convergence, parser })
    }

    /// Move `provider` to the head of the failover order
    pub fn with_primary(mut self, provider: Provider) -> Result<Self>
    {   promote(&mut self.providers, provider)?;
        Ok(self)
    }

    pub fn primary(&self) -> Option<&ProviderConfig>
    {   self.providers.first()
    }
}

fn promote(providers: &mut Vec<ProviderConfig>, provider: Provider)
  -> Result<()>
{   let index = providers.iter()
      .position(|p| p.provider == provider)
      .ok_or_else(|| Error::MissingApiKey(provider.to_string()))?;
    let entry = providers.remove(index);
    providers.insert(0, entry);
    Ok(())
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)])
      -> impl Fn(&str) -> Option<String>
    {   let map: HashMap<String, String> = pairs.iter()
          .map(|(k, v)| (k.to_string(), v.to_string()))
          .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn no_keys_yields_no_providers()
    {   let config = EssayConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.providers.is_empty());
        assert!(config.primary().is_none());
    }

    #[test]
    fn openai_is_primary_by_default()
    {   let config = EssayConfig::from_lookup(lookup(&[
          ("GEMINI_API_KEY", "g-key")
        , ("OPENAI_API_KEY", "o-key")
        ])).unwrap();
        let order: Vec<Provider> = config.providers.iter()
          .map(|p| p.provider)
          .collect();
        assert_eq!(order, vec![Provider::OpenAI, Provider::Gemini]);
    }

    #[test]
    fn blank_key_is_ignored()
    {   let config = EssayConfig::from_lookup(lookup(&[
          ("OPENAI_API_KEY", "   ")
        , ("ANTHROPIC_API_KEY", "a-key")
        ])).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].provider, Provider::Anthropic);
    }

    #[test]
    fn primary_override_reorders()
    {   let config = EssayConfig::from_lookup(lookup(&[
          ("OPENAI_API_KEY", "o-key")
        , ("GEMINI_API_KEY", "g-key")
        , ("ESSAY_PRIMARY_PROVIDER", "gemini")
        ])).unwrap();
        assert_eq!(config.providers[0].provider, Provider::Gemini);
        assert_eq!(config.providers[1].provider, Provider::OpenAI);
    }

    #[test]
    fn primary_override_without_key_fails()
    {   let err = EssayConfig::from_lookup(lookup(&[
          ("OPENAI_API_KEY", "o-key")
        , ("ESSAY_PRIMARY_PROVIDER", "anthropic")
        ])).unwrap_err();
        assert_eq!(err, Error::MissingApiKey("Anthropic".to_string()));
    }

    #[test]
    fn model_fallback_overrides_openai_model()
    {   let config = EssayConfig::from_lookup(lookup(&[
          ("OPENAI_API_KEY", "o-key")
        , ("MODEL_FALLBACK", "gpt-4o")
        ])).unwrap();
        assert_eq!(config.providers[0].model, "gpt-4o");
    }

    #[test]
    fn tolerance_and_policy_overrides()
    {   let config = EssayConfig::from_lookup(lookup(&[
          ("ESSAY_WORD_TOLERANCE", "0.05")
        , ("ESSAY_CORRECTION_FAILURE", "propagate")
        ])).unwrap();
        assert_eq!(config.convergence.tolerance, 0.05);
        assert_eq!(
          config.convergence.correction_failure,
          CorrectionFailurePolicy::Propagate
        );
        assert!(EssayConfig::from_lookup(lookup(&[
          ("ESSAY_WORD_TOLERANCE", "1.5")
        ])).is_err());
    }

    #[test]
    fn token_budget_is_capped_per_provider()
    {   let openai = TokenBudget::for_provider(&Provider::OpenAI);
        assert_eq!(openai.max_output_tokens(300), 950);
        assert_eq!(openai.max_output_tokens(5000), 4096);

        let gemini = TokenBudget::for_provider(&Provider::Gemini);
        assert_eq!(gemini.max_output_tokens(300), 1600);
        assert_eq!(gemini.max_output_tokens(5000), 8192);
    }

    #[test]
    fn api_key_is_not_serialized()
    {   let config = ProviderConfig::new(Provider::OpenAI, "sk-secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn custom_base_trims_trailing_slash()
    {   let config = ProviderConfig::new(Provider::Gemini, "k")
          .with_api_base("http://127.0.0.1:9000/");
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
    }
}
