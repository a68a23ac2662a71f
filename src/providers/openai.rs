use serde::{Deserialize, Serialize};
use log::warn;

use super::{first_text, parse_body, WireRequest};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::Provider;

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub max_tokens: u32
  , pub temperature: f32
}

/// Chat completions shape plus the alternates seen from
/// compatible servers and the responses endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiResponse
{   #[serde(default)]
    pub choices: Vec<Choice>
  , #[serde(default)]
    pub output: Vec<OutputItem>
  , #[serde(default)]
    pub output_text: Option<String>
  , #[serde(default)]
    pub content: Vec<ContentBlock>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   #[serde(default)]
    pub message: Option<ChoiceMessage>
  , #[serde(default)]
    pub text: Option<String>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage
{   #[serde(default)]
    pub content: Option<String>
  , #[serde(default)]
    pub refusal: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputItem
{   #[serde(default)]
    pub content: Vec<OutputContent>
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputContent
{   #[serde(default)]
    pub text: Option<String>
  , #[serde(default)]
    pub refusal: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock
{   #[serde(default)]
    pub text: Option<String>
}

pub(crate) fn build_request(
  config: &ProviderConfig
, system: &str
, user: &str
, max_tokens: u32
) -> Result<WireRequest>
{   let request = OpenAiChatRequest
    {   model: config.model.clone()
      , messages: vec![
          ChatMessage
          {   role: "system".to_string()
            , content: system.to_string()
          }
        , ChatMessage
          {   role: "user".to_string()
            , content: user.to_string()
          }
        ]
      , max_tokens
      , temperature: config.temperature
    };

    Ok(WireRequest
    {   url: format!("{}/chat/completions", config.base_url())
      , headers: vec![
          ("Authorization", format!("Bearer {}", config.api_key))
        ]
      , body: serde_json::to_value(&request)
          .map_err(|e| Error::ParseError(e.to_string()))?
    })
}

fn blocked(reason: impl Into<String>) -> Error
{   let reason = reason.into();
    warn!("OpenAI refused the request: {}", reason);
    Error::ContentBlocked
    {   provider: Provider::OpenAI.to_string()
      , reason
    }
}

pub(crate) fn extract_text(body: &str) -> Result<String>
{   let response: OpenAiResponse = parse_body(Provider::OpenAI, body)?;

    if let Some(choice) = response.choices.first()
    {   if let Some(refusal) = choice.message.as_ref()
          .and_then(|m| m.refusal.clone())
          .filter(|r| !r.trim().is_empty())
        {   return Err(blocked(refusal));
        }
        if choice.finish_reason.as_deref() == Some("content_filter")
        {   return Err(blocked("content_filter"));
        }
    }
    if let Some(refusal) = response.output.iter()
      .flat_map(|item| item.content.iter())
      .find_map(|c| c.refusal.clone())
    {   return Err(blocked(refusal));
    }

    let choice = response.choices.first();
    first_text([
      choice.and_then(|c| c.message.as_ref())
        .and_then(|m| m.content.clone())
    , choice.and_then(|c| c.text.clone())
    , response.output.iter()
        .flat_map(|item| item.content.iter())
        .find_map(|c| c.text.clone())
    , response.output_text.clone()
    , response.content.first().and_then(|c| c.text.clone())
    ])
    .ok_or_else(|| Error::EmptyGeneration(Provider::OpenAI.to_string()))
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn request_carries_both_messages_and_budget()
    {   let config = ProviderConfig::new(Provider::OpenAI, "sk-test");
        let wire = build_request(&config, "sys", "usr", 950).unwrap();
        assert_eq!(wire.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(
          wire.headers,
          vec![("Authorization", "Bearer sk-test".to_string())]
        );
        assert_eq!(wire.body["model"], "gpt-4o-mini");
        assert_eq!(wire.body["max_tokens"], 950);
        assert_eq!(wire.body["messages"][0]["role"], "system");
        assert_eq!(wire.body["messages"][1]["content"], "usr");
    }

    #[test]
    fn extracts_chat_completion_content()
    {   let body = r#"{"choices":[{"message":{"role":"assistant","content":"An essay."},"finish_reason":"stop"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "An essay.");
    }

    #[test]
    fn falls_back_to_responses_shape()
    {   let body = r#"{"output":[{"content":[{"type":"output_text","text":"From output."}]}]}"#;
        assert_eq!(extract_text(body).unwrap(), "From output.");

        let body = r#"{"content":[{"text":"From content."}]}"#;
        assert_eq!(extract_text(body).unwrap(), "From content.");
    }

    #[test]
    fn refusal_is_blocked()
    {   let body = r#"{"choices":[{"message":{"content":null,"refusal":"I can't help with that."}}]}"#;
        assert_eq!(
          extract_text(body).unwrap_err(),
          Error::ContentBlocked
          {   provider: "OpenAI".to_string()
            , reason: "I can't help with that.".to_string()
          }
        );

        let body = r#"{"choices":[{"message":{"content":""},"finish_reason":"content_filter"}]}"#;
        assert!(matches!(
          extract_text(body),
          Err(Error::ContentBlocked { .. })
        ));
    }

    #[test]
    fn empty_content_is_empty_generation()
    {   let body = r#"{"choices":[{"message":{"content":"   "}}]}"#;
        assert_eq!(
          extract_text(body).unwrap_err(),
          Error::EmptyGeneration("OpenAI".to_string())
        );
    }

    #[test]
    fn garbage_is_parse_error()
    {   assert!(matches!(
          extract_text("<html>"),
          Err(Error::ParseError(_))
        ));
    }
}
