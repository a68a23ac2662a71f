pub mod error;
pub mod config;
pub mod request;
pub mod prompt;
pub mod providers;
pub mod parser;
pub mod failover;
pub mod convergence;
pub mod pipeline;
pub mod client;
use serde::{Deserialize, Serialize};

/*

essayforge turns one structured essay request into prose of the
requested length. One job = at most two sequential provider calls:

  EssayRequest
    -> prompt::build_prompts          (system, user)
    -> failover::Orchestrator         primary, then fallback provider
         -> providers::ProviderClient (openai | gemini | anthropic wire)
         -> parser::parse_response    {outline?, essay}
    -> convergence::converge          one corrective pass if out of band
    -> EssayResponse

*/

pub use client::EssayBackend;
pub use config::EssayConfig;
pub use error::{Error, FailureKind, Result};
pub use pipeline::EssayPipeline;
pub use request::{EssayRequest, EssayResponse, GenerationResult};

/// ESSAYFORGE API INTERFACE:

// ===== GenerateEssay =====

pub type GenerateEssayReply
  = std::result::Result<EssayResponse, crate::error::Error>;
pub type GenerateEssayReplySender
  = tokio::sync::mpsc::UnboundedSender<GenerateEssayReply>;

pub struct GenerateEssayArgs
{   pub request: EssayRequest
  , pub reply: GenerateEssayReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = std::result::Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== EssayHand (sender side) =====

pub struct EssayHand
{   pub generate_essay_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateEssayArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== EssayFoot (receiver side) =====

pub struct EssayFoot
{   pub generate_essay_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateEssayArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// ESSAYFORGE STRUCTURES:

/// Text generation backends essayforge can talk to.
/// Each variant has its own wire adapter under `providers/`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize
)]
#[serde(rename_all = "lowercase")]
pub enum Provider
{   /// OpenAI-compatible chat completions
    OpenAI
  , /// Google Gemini generateContent
    Gemini
  , /// Anthropic messages
    Anthropic
}

impl Provider
{   /// Default failover order when nothing overrides it
    pub fn all() -> [Provider; 3]
    {   [Provider::OpenAI, Provider::Gemini, Provider::Anthropic]
    }

    /// Environment variable holding this provider's credential
    pub fn key_var(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "OPENAI_API_KEY"
          , Provider::Gemini => "GEMINI_API_KEY"
          , Provider::Anthropic => "ANTHROPIC_API_KEY"
        }
    }

    pub fn default_model(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "gpt-4o-mini"
          , Provider::Gemini => "gemini-1.5-flash"
          , Provider::Anthropic => "claude-3-5-haiku-latest"
        }
    }
}

impl std::fmt::Display for Provider
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   let name = match self
        {   Provider::OpenAI => "OpenAI"
          , Provider::Gemini => "Gemini"
          , Provider::Anthropic => "Anthropic"
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Provider
{   type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err>
    {   match s.trim().to_ascii_lowercase().as_str()
        {   "openai" => Ok(Provider::OpenAI)
          , "gemini" | "google" => Ok(Provider::Gemini)
          , "anthropic" | "claude" => Ok(Provider::Anthropic)
          , other => Err(crate::error::Error::InvalidConfiguration(
              format!("unknown provider: {}", other)
            ))
        }
    }
}
