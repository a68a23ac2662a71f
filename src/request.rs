//! Unified request and response types for essay generation

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MIN_TOPIC_CHARS: usize = 3;
pub const MIN_WORD_COUNT: u32 = 100;
pub const MAX_WORD_COUNT: u32 = 2000;
pub const MAX_EXTRAS_CHARS: usize = 2000;

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize
)]
#[serde(rename_all = "lowercase")]
pub enum Tone
{   #[default]
    Academic
  , Formal
  , Informal
  , Persuasive
  , Creative
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize
)]
#[serde(rename_all = "lowercase")]
pub enum Level
{   Beginner
  , #[default]
    Intermediate
  , Advanced
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize
)]
#[serde(rename_all = "lowercase")]
pub enum Citations
{   #[default]
    None
  , Apa
  , Mla
}

impl Tone
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Tone::Academic => "academic"
          , Tone::Formal => "formal"
          , Tone::Informal => "informal"
          , Tone::Persuasive => "persuasive"
          , Tone::Creative => "creative"
        }
    }
}

impl Level
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Level::Beginner => "beginner"
          , Level::Intermediate => "intermediate"
          , Level::Advanced => "advanced"
        }
    }
}

impl Citations
{   /// Style label as it appears in prompts; `None` for no citations
    pub fn style(&self) -> Option<&'static str>
    {   match self
        {   Citations::None => None
          , Citations::Apa => Some("APA")
          , Citations::Mla => Some("MLA")
        }
    }
}

fn default_outline_first() -> bool
{   true
}

/// Essay request as handed over by the request boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayRequest
{   pub topic: String
  , pub word_count: u32
  , #[serde(default)]
    pub tone: Tone
  , #[serde(default)]
    pub level: Level
  , #[serde(default = "default_outline_first")]
    pub outline_first: bool
  , #[serde(default)]
    pub citations: Citations
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<String>
}

impl EssayRequest
{   pub fn new(topic: impl Into<String>, word_count: u32) -> Self
    {   EssayRequest
        {   topic: topic.into()
          , word_count
          , tone: Tone::default()
          , level: Level::default()
          , outline_first: default_outline_first()
          , citations: Citations::default()
          , extras: None
        }
    }

    /// Reject requests the generation core must never see
    pub fn validate(&self) -> Result<()>
    {   if self.topic.trim().chars().count() < MIN_TOPIC_CHARS
        {   return Err(Error::InvalidRequest(format!(
              "Topic must be at least {} characters",
              MIN_TOPIC_CHARS
            )));
        }
        if self.word_count < MIN_WORD_COUNT
        {   return Err(Error::InvalidRequest(
              format!("Minimum {} words", MIN_WORD_COUNT)
            ));
        }
        if self.word_count > MAX_WORD_COUNT
        {   return Err(Error::InvalidRequest(
              format!("Max {} words", MAX_WORD_COUNT)
            ));
        }
        if let Some(extras) = &self.extras
        {   if extras.chars().count() > MAX_EXTRAS_CHARS
            {   return Err(Error::InvalidRequest(format!(
                  "Extra constraints must be at most {} characters",
                  MAX_EXTRAS_CHARS
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON request body
    pub fn from_json(body: &str) -> Result<Self>
    {   let request: EssayRequest = serde_json::from_str(body)
          .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    /// Extras with surrounding whitespace removed, if any remain
    pub fn extras_text(&self) -> Option<&str>
    {   self.extras.as_deref()
          .map(str::trim)
          .filter(|s| !s.is_empty())
    }
}

/// Output of one successful provider call, after outline parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult
{   /// Essay body; never empty on success
    pub essay: String
  , /// Outline items in order, when the model produced one
    pub outline: Option<Vec<String>>
  , /// Provider that generated it
    pub provider: crate::Provider
}

/// Response handed back to the request boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayResponse
{   pub outline: Vec<String>
  , pub essay: String
  , pub actual_word_count: usize
  , pub target_word_count: u32
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn defaults_fill_missing_fields()
    {   let request = EssayRequest::from_json(
          r#"{"topic":"Renewable energy","wordCount":300}"#
        ).unwrap();
        assert_eq!(request.tone, Tone::Academic);
        assert_eq!(request.level, Level::Intermediate);
        assert!(request.outline_first);
        assert_eq!(request.citations, Citations::None);
        assert_eq!(request.extras, None);
    }

    #[test]
    fn enums_parse_lowercase()
    {   let request = EssayRequest::from_json(
          r#"{"topic":"Urban trees","wordCount":500,"tone":"persuasive",
              "level":"advanced","outlineFirst":false,"citations":"mla",
              "extras":"Mention Paris."}"#
        ).unwrap();
        assert_eq!(request.tone, Tone::Persuasive);
        assert_eq!(request.level, Level::Advanced);
        assert!(!request.outline_first);
        assert_eq!(request.citations.style(), Some("MLA"));
        assert_eq!(request.extras_text(), Some("Mention Paris."));
    }

    #[test]
    fn rejects_short_topic_and_bad_counts()
    {   assert!(EssayRequest::new("AI", 300).validate().is_err());
        assert!(EssayRequest::new("Solar", 99).validate().is_err());
        assert!(EssayRequest::new("Solar", 2001).validate().is_err());
        assert!(EssayRequest::new("Solar", 100).validate().is_ok());
        assert!(EssayRequest::new("Solar", 2000).validate().is_ok());
    }

    #[test]
    fn rejects_unknown_tone()
    {   let err = EssayRequest::from_json(
          r#"{"topic":"Solar","wordCount":300,"tone":"sarcastic"}"#
        ).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn rejects_long_extras()
    {   let mut request = EssayRequest::new("Solar power", 300);
        request.extras = Some("x".repeat(MAX_EXTRAS_CHARS + 1));
        assert!(request.validate().is_err());
    }

    #[test]
    fn response_uses_camel_case()
    {   let response = EssayResponse
        {   outline: vec![]
          , essay: "Body".to_string()
          , actual_word_count: 1
          , target_word_count: 300
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["actualWordCount"], 1);
        assert_eq!(json["targetWordCount"], 300);
    }
}
