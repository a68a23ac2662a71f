//! Word-count convergence: measure the essay, and if it falls outside the
//! tolerance band, issue exactly one corrective regeneration.

use log::{error, info, warn};

use crate::config::{ConvergenceConfig, CorrectionFailurePolicy};
use crate::error::{Error, Result};
use crate::failover::Orchestrator;

/// Count whitespace-separated tokens that contain a letter or digit
pub fn count_words(text: &str) -> usize
{   text.split_whitespace()
      .filter(|token| token.chars().any(char::is_alphanumeric))
      .count()
}

/// Inclusive word-count range accepted without correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToleranceBand
{   pub lower: usize
  , pub upper: usize
}

impl ToleranceBand
{   pub fn new(target: u32, tolerance: f64) -> Self
    {   let target = target as f64;
        ToleranceBand
        {   lower: (target * (1.0 - tolerance)).round().max(0.0) as usize
          , upper: (target * (1.0 + tolerance)).round() as usize
        }
    }

    pub fn contains(&self, count: usize) -> bool
    {   self.lower <= count && count <= self.upper
    }
}

/// Direction and size of the correction to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment
{   Expand(usize)
  , Trim(usize)
}

impl Adjustment
{   pub fn between(target: u32, measured: usize) -> Option<Self>
    {   let target = target as usize;
        if measured < target
        {   Some(Adjustment::Expand(target - measured))
        } else if measured > target
        {   Some(Adjustment::Trim(measured - target))
        } else
        {   None
        }
    }

    pub fn instruction(&self, target: u32) -> String
    {   match self
        {   Adjustment::Expand(words) => format!(
              "This essay is {} words short of the {}-word target. Please expand it by {} words by adding more detailed examples, analysis, and supporting evidence while maintaining coherence and flow."
            , words, target, words
            )
          , Adjustment::Trim(words) => format!(
              "This essay is {} words over the {}-word target. Please trim it by {} words by removing redundancy and condensing ideas while preserving all key points and arguments."
            , words, target, words
            )
        }
    }
}

/// What happened during one convergence run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceOutcome
{   /// Word count of the first-pass essay
    pub measured: usize
  , pub target: u32
  , pub band: ToleranceBand
  , /// Whether a corrective call was issued
    pub correction_attempted: bool
  , /// Whether that call produced the final essay
    pub corrected: bool
  , pub final_essay: String
  , pub final_word_count: usize
}

pub fn corrective_system(system: &str) -> String
{   format!("{} Focus on precise word count adjustment.", system)
}

pub fn corrective_user(adjustment: Adjustment, target: u32, essay: &str)
  -> String
{   format!(
      "{}\n\nOriginal essay:\n{}",
      adjustment.instruction(target),
      essay
    )
}

/// Bring `essay` within tolerance of `target` with at most one corrective
/// call. Whatever the corrective call returns is final.
pub async fn converge(
  orchestrator: &Orchestrator
, essay: &str
, target: u32
, system: &str
, config: &ConvergenceConfig
) -> Result<ConvergenceOutcome>
{   let measured = count_words(essay);
    let band = ToleranceBand::new(target, config.tolerance);
    let unchanged = |attempted: bool| ConvergenceOutcome
    {   measured
      , target
      , band
      , correction_attempted: attempted
      , corrected: false
      , final_essay: essay.to_string()
      , final_word_count: measured
    };

    let adjustment = match Adjustment::between(target, measured)
    {   Some(adjustment) if !band.contains(measured) => adjustment
      , _ => {
          info!(
            "Word count {} is within tolerance ({}-{})",
            measured, band.lower, band.upper
          );
          return Ok(unchanged(false));
        }
    };

    info!(
      "Word count {} outside tolerance ({}-{}), requesting {:?}",
      measured, band.lower, band.upper, adjustment
    );

    let result = orchestrator.generate(
      &corrective_system(system),
      &corrective_user(adjustment, target, essay),
      target
    ).await;

    match result
    {   Ok(corrected) => {
          let final_essay = corrected.essay.trim().to_string();
          let final_word_count = count_words(&final_essay);
          info!("Adjusted essay: {} words", final_word_count);
          Ok(ConvergenceOutcome
          {   measured
            , target
            , band
            , correction_attempted: true
            , corrected: true
            , final_essay
            , final_word_count
          })
        }
      , Err(err) => match config.correction_failure
        {   CorrectionFailurePolicy::ReturnOriginal => {
              warn!("Error adjusting word count, keeping original: {}", err);
              Ok(unchanged(true))
            }
          , CorrectionFailurePolicy::Propagate => {
              error!("Error adjusting word count: {}", err);
              Err(Error::CorrectionFailed(err.to_string()))
            }
        }
    }
}
