//! One essay job from validated request to response

use log::info;

use crate::config::{ConvergenceConfig, EssayConfig};
use crate::convergence::converge;
use crate::error::Result;
use crate::failover::Orchestrator;
use crate::prompt::build_prompts;
use crate::request::{EssayRequest, EssayResponse};

/// Stateless essay pipeline; cheap to clone and share between jobs
#[derive(Clone)]
pub struct EssayPipeline
{   orchestrator: Orchestrator
  , convergence: ConvergenceConfig
}

impl EssayPipeline
{   pub fn new(
      orchestrator: Orchestrator
    , convergence: ConvergenceConfig
    ) -> Self
    {   EssayPipeline { orchestrator, convergence }
    }

    pub fn from_config(config: &EssayConfig) -> Result<Self>
    {   Ok(EssayPipeline::new(
          Orchestrator::from_config(config)?,
          config.convergence
        ))
    }

    pub async fn run(&self, request: &EssayRequest)
      -> Result<EssayResponse>
    {   request.validate()?;
        let prompts = build_prompts(request);
        info!(
          "Generating essay: topic={:?} words={} tone={:?} level={:?} outline_first={} citations={:?}",
          request.topic,
          request.word_count,
          request.tone,
          request.level,
          request.outline_first,
          request.citations
        );

        let result = self.orchestrator
          .generate(&prompts.system, &prompts.user, request.word_count)
          .await?;

        let outcome = converge(
          &self.orchestrator,
          &result.essay,
          request.word_count,
          &prompts.system,
          &self.convergence
        ).await?;

        info!(
          "Generated essay via {}: {} words (target: {}, corrected: {})",
          result.provider,
          outcome.final_word_count,
          request.word_count,
          outcome.corrected
        );

        Ok(EssayResponse
        {   outline: result.outline.unwrap_or_default()
          , essay: outcome.final_essay
          , actual_word_count: outcome.final_word_count
          , target_word_count: request.word_count
        })
    }
}
