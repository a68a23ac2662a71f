use serde::{Deserialize, Serialize};
use log::warn;

use super::{first_text, parse_body, WireRequest};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::Provider;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a>
{   model: &'a str
  , max_tokens: u32
  , system: &'a str
  , messages: Vec<AnthropicMessage<'a>>
  , temperature: f32
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a>
{   role: &'a str
  , content: &'a str
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse
{   #[serde(default)]
    content: Vec<ContentBlock>
  , #[serde(default)]
    stop_reason: Option<String>
  , /// Legacy text completions endpoint
    #[serde(default)]
    completion: Option<String>
}

#[derive(Debug, Deserialize)]
struct ContentBlock
{   #[serde(rename = "type", default)]
    block_type: String
  , #[serde(default)]
    text: Option<String>
}

pub(crate) fn build_request(
  config: &ProviderConfig
, system: &str
, user: &str
, max_tokens: u32
) -> Result<WireRequest>
{   let request = AnthropicRequest
    {   model: &config.model
      , max_tokens
      , system
      , messages: vec![AnthropicMessage { role: "user", content: user }]
      , temperature: config.temperature
    };

    Ok(WireRequest
    {   url: format!("{}/messages", config.base_url())
      , headers: vec![
          ("x-api-key", config.api_key.clone())
        , ("anthropic-version", ANTHROPIC_VERSION.to_string())
        ]
      , body: serde_json::to_value(&request)
          .map_err(|e| Error::ParseError(e.to_string()))?
    })
}

pub(crate) fn extract_text(body: &str) -> Result<String>
{   let response: AnthropicResponse
      = parse_body(Provider::Anthropic, body)?;

    if response.stop_reason.as_deref() == Some("refusal")
    {   warn!("Anthropic refused the request");
        return Err(Error::ContentBlocked
        {   provider: Provider::Anthropic.to_string()
          , reason: "refusal".to_string()
        });
    }

    let joined: String = response.content.iter()
      .filter(|b| b.block_type == "text")
      .filter_map(|b| b.text.as_deref())
      .collect::<Vec<_>>()
      .join("");

    first_text([Some(joined), response.completion])
      .ok_or_else(|| {
        Error::EmptyGeneration(Provider::Anthropic.to_string())
      })
}
