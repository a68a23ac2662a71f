//! Failover across providers: primary first, then each fallback once

use std::sync::Arc;
use log::{debug, info, warn};

use crate::config::{EssayConfig, ParserConfig};
use crate::error::{Error, Result};
use crate::parser::parse_response;
use crate::providers::{Generate, ProviderClient};
use crate::request::GenerationResult;

/// Where one job stands in its walk over the providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState
{   NotAttempted
  , TryingPrimary
  , TryingFallback
  , Succeeded
  , Failed
}

/// Failover provider sequence for a single job
pub struct FailoverSequence<'a>
{   providers: &'a [Arc<dyn Generate>]
  , current_index: usize
  , state: AttemptState
}

impl<'a> FailoverSequence<'a>
{   /// Create a new failover sequence
    pub fn new(providers: &'a [Arc<dyn Generate>]) -> Self
    {   debug!(
          "Creating failover sequence with {} providers",
          providers.len()
        );
        FailoverSequence
        {   providers
          , current_index: 0
          , state: AttemptState::NotAttempted
        }
    }

    pub fn state(&self) -> AttemptState
    {   self.state
    }

    /// Get the provider currently being tried
    pub fn current(&self) -> Option<&'a Arc<dyn Generate>>
    {   match self.state
        {   AttemptState::TryingPrimary
          | AttemptState::TryingFallback
          | AttemptState::Succeeded => self.providers.get(self.current_index)
          , _ => None
        }
    }

    /// Check if we have more providers to try
    pub fn has_next(&self) -> bool
    {   self.current_index + 1 < self.providers.len()
    }

    /// Move to the next provider that has not been tried yet.
    /// Returns `None` (and enters `Failed`) once none remain.
    pub fn advance(&mut self) -> Option<&'a Arc<dyn Generate>>
    {   match self.state
        {   AttemptState::NotAttempted => {
              if self.providers.is_empty()
              {   self.state = AttemptState::Failed;
                  return None;
              }
              self.state = AttemptState::TryingPrimary;
            }
          , AttemptState::TryingPrimary
          | AttemptState::TryingFallback => {
              if !self.has_next()
              {   self.state = AttemptState::Failed;
                  return None;
              }
              self.current_index += 1;
              self.state = AttemptState::TryingFallback;
            }
          , AttemptState::Succeeded
          | AttemptState::Failed => return None
        }
        self.current()
    }

    pub fn succeed(&mut self)
    {   self.state = AttemptState::Succeeded;
    }

    pub fn fail(&mut self)
    {   self.state = AttemptState::Failed;
    }
}

/// Keep the first failure unless a later one says more
fn more_specific(current: Option<Error>, candidate: Error) -> Error
{   match current
    {   Some(current)
          if current.specificity() >= candidate.specificity() => current
      , _ => candidate
    }
}

/// Selects a provider, invokes it, parses its output.
///
/// Holds no per-job state, so one instance serves concurrent jobs.
#[derive(Clone)]
pub struct Orchestrator
{   providers: Vec<Arc<dyn Generate>>
  , parser: ParserConfig
}

impl Orchestrator
{   pub fn new(
      providers: Vec<Arc<dyn Generate>>
    , parser: ParserConfig
    ) -> Self
    {   Orchestrator { providers, parser }
    }

    /// One HTTP client per configured provider, in configured order
    pub fn from_config(config: &EssayConfig) -> Result<Self>
    {   let providers = config.providers.iter()
          .map(|p| {
            ProviderClient::new(p.clone())
              .map(|client| Arc::new(client) as Arc<dyn Generate>)
          })
          .collect::<Result<Vec<_>>>()?;
        Ok(Orchestrator::new(providers, config.parser))
    }

    async fn attempt(
      &self
    , generator: &Arc<dyn Generate>
    , system: &str
    , user: &str
    , word_count: u32
    ) -> Result<GenerationResult>
    {   let provider = generator.provider();
        let raw = generator.generate(system, user, word_count).await?;
        let parsed = parse_response(&raw, &self.parser);
        if parsed.essay.trim().is_empty()
        {   return Err(Error::EmptyGeneration(provider.to_string()));
        }
        Ok(GenerationResult
        {   essay: parsed.essay
          , outline: parsed.outline
          , provider
        })
    }

    /// Generate with failover. Each provider is tried at most once.
    pub async fn generate(
      &self
    , system: &str
    , user: &str
    , word_count: u32
    ) -> Result<GenerationResult>
    {   if self.providers.is_empty()
        {   return Err(Error::NoProviderConfigured);
        }

        let mut sequence = FailoverSequence::new(&self.providers);
        let mut surfaced: Option<Error> = None;

        while let Some(generator) = sequence.advance()
        {   info!(
              "Using {} ({:?})",
              generator.provider(),
              sequence.state()
            );
            match self.attempt(generator, system, user, word_count).await
            {   Ok(result) => {
                  sequence.succeed();
                  return Ok(result);
                }
              , Err(err) => {
                  warn!("{} failed: {}", generator.provider(), err);
                  let retryable = err.is_retryable_elsewhere();
                  surfaced = Some(more_specific(surfaced, err));
                  if !retryable
                  {   break;
                  }
                  if sequence.has_next()
                  {   info!("Falling back to next provider");
                  }
                }
            }
        }

        sequence.fail();
        Err(surfaced.unwrap_or(Error::NoProviderConfigured))
    }
}
