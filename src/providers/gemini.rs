//! Google Gemini `generateContent` adapter.
//!
//! Gemini takes a single prompt, so system and user instructions are
//! concatenated. Safety blocks arrive as 200 responses and are turned into
//! [`Error::ContentBlocked`] here.

use serde::{Deserialize, Serialize};
use log::warn;

use super::{first_text, parse_body, WireRequest};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::Provider;

const HARM_CATEGORIES: [&str; 4] = [
  "HARM_CATEGORY_HARASSMENT"
, "HARM_CATEGORY_HATE_SPEECH"
, "HARM_CATEGORY_SEXUALLY_EXPLICIT"
, "HARM_CATEGORY_DANGEROUS_CONTENT"
];

/// Finish reasons that mean the candidate was withheld
const BLOCKING_FINISH_REASONS: [&str; 5] = [
  "SAFETY"
, "RECITATION"
, "BLOCKLIST"
, "PROHIBITED_CONTENT"
, "SPII"
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest
{   contents: Vec<Content>
  , generation_config: GenerationConfig
  , #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>
}

#[derive(Debug, Serialize)]
struct Content
{   role: String
  , parts: Vec<Part>
}

#[derive(Debug, Serialize)]
struct Part
{   text: String
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig
{   temperature: f32
  , max_output_tokens: u32
  , top_p: f32
  , top_k: u32
}

#[derive(Debug, Serialize)]
struct SafetySetting
{   category: String
  , threshold: String
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse
{   #[serde(default)]
    candidates: Vec<Candidate>
  , #[serde(default)]
    prompt_feedback: Option<PromptFeedback>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate
{   #[serde(default)]
    content: Option<CandidateContent>
  , #[serde(default)]
    finish_reason: Option<String>
  , /// Older text-bison style responses
    #[serde(default)]
    output: Option<String>
}

#[derive(Debug, Deserialize)]
struct CandidateContent
{   #[serde(default)]
    parts: Vec<PartResponse>
}

#[derive(Debug, Deserialize)]
struct PartResponse
{   #[serde(default)]
    text: Option<String>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback
{   #[serde(default)]
    block_reason: Option<String>
}

pub(crate) fn build_request(
  config: &ProviderConfig
, system: &str
, user: &str
, max_tokens: u32
) -> Result<WireRequest>
{   let safety_settings = match &config.safety_threshold
    {   Some(threshold) => HARM_CATEGORIES.iter()
          .map(|category| SafetySetting
          {   category: category.to_string()
            , threshold: threshold.clone()
          })
          .collect()
      , None => Vec::new()
    };

    let request = GeminiRequest
    {   contents: vec![
          Content
          {   role: "user".to_string()
            , parts: vec![Part { text: format!("{}\n\n{}", system, user) }]
          }
        ]
      , generation_config: GenerationConfig
        {   temperature: config.temperature
          , max_output_tokens: max_tokens
          , top_p: 0.95
          , top_k: 40
        }
      , safety_settings
    };

    Ok(WireRequest
    {   url: format!(
          "{}/models/{}:generateContent",
          config.base_url(),
          config.model
        )
      , headers: vec![("x-goog-api-key", config.api_key.clone())]
      , body: serde_json::to_value(&request)
          .map_err(|e| Error::ParseError(e.to_string()))?
    })
}

fn blocked(reason: &str) -> Error
{   warn!("Gemini blocked the request: {}", reason);
    Error::ContentBlocked
    {   provider: Provider::Gemini.to_string()
      , reason: reason.to_string()
    }
}

pub(crate) fn extract_text(body: &str) -> Result<String>
{   let response: GeminiResponse = parse_body(Provider::Gemini, body)?;

    if let Some(reason) = response.prompt_feedback.as_ref()
      .and_then(|f| f.block_reason.as_deref())
    {   return Err(blocked(reason));
    }

    let Some(candidate) = response.candidates.first() else {
      return Err(Error::EmptyGeneration(Provider::Gemini.to_string()));
    };

    if let Some(reason) = candidate.finish_reason.as_deref()
      .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
    {   return Err(blocked(reason));
    }

    let joined = candidate.content.as_ref().map(|content| {
      content.parts.iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
    });

    first_text([joined, candidate.output.clone()])
      .ok_or_else(|| Error::EmptyGeneration(Provider::Gemini.to_string()))
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn request_combines_prompts_under_contents()
    {   let config = ProviderConfig::new(Provider::Gemini, "g-key");
        let wire = build_request(&config, "sys", "usr", 1600).unwrap();
        assert_eq!(
          wire.url,
          "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
          wire.headers,
          vec![("x-goog-api-key", "g-key".to_string())]
        );
        assert_eq!(wire.body["contents"][0]["parts"][0]["text"], "sys\n\nusr");
        assert_eq!(wire.body["generationConfig"]["maxOutputTokens"], 1600);
        assert_eq!(wire.body["generationConfig"]["topK"], 40);
        assert!(wire.body.get("safetySettings").is_none());
    }

    #[test]
    fn safety_threshold_applies_to_all_categories()
    {   let mut config = ProviderConfig::new(Provider::Gemini, "g-key");
        config.safety_threshold = Some("BLOCK_ONLY_HIGH".to_string());
        let wire = build_request(&config, "s", "u", 100).unwrap();
        let settings = wire.body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        assert_eq!(settings[0]["threshold"], "BLOCK_ONLY_HIGH");
    }

    #[test]
    fn joins_candidate_parts()
    {   let body = r#"{"candidates":[{"content":{"parts":[{"text":"Part one. "},{"text":"Part two."}]},"finishReason":"STOP"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Part one. Part two.");
    }

    #[test]
    fn prompt_block_reason_is_surfaced()
    {   let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert_eq!(
          extract_text(body).unwrap_err(),
          Error::ContentBlocked
          {   provider: "Gemini".to_string()
            , reason: "SAFETY".to_string()
          }
        );
    }

    #[test]
    fn safety_finish_reason_is_blocked()
    {   let body = r#"{"candidates":[{"finishReason":"RECITATION"}]}"#;
        assert!(matches!(
          extract_text(body),
          Err(Error::ContentBlocked { reason, .. }) if reason == "RECITATION"
        ));
    }

    #[test]
    fn no_candidates_is_empty_generation()
    {   assert_eq!(
          extract_text("{}").unwrap_err(),
          Error::EmptyGeneration("Gemini".to_string())
        );
    }

    #[test]
    fn legacy_output_field_is_used()
    {   let body = r#"{"candidates":[{"output":"Legacy text."}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Legacy text.");
    }
}
