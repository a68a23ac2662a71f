//! Prompt assembly: pure mapping from a request to instruction strings

use crate::request::EssayRequest;

/// Tolerance promised to the model; looser than the acceptance band so the
/// first pass usually lands inside it.
pub const PROMPT_TOLERANCE_PERCENT: u32 = 5;

/// System and user instructions for one generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts
{   pub system: String
  , pub user: String
}

pub fn build_prompts(request: &EssayRequest) -> Prompts
{   Prompts
    {   system: system_instruction(request)
      , user: user_instruction(request)
    }
}

pub fn system_instruction(request: &EssayRequest) -> String
{   let mut parts = vec![
      "You are an expert essay writer and editor.".to_string()
    , "Write original, non-plagiarized essays with a clear introduction, body and conclusion."
        .to_string()
    , format!(
        "Write in a {} tone for a {} reader.",
        request.tone.as_str(),
        request.level.as_str()
      )
    , "Prefer concise sentences, varied transitions and active voice."
        .to_string()
    ];

    if let Some(style) = request.citations.style()
    {   parts.push(format!(
          "Cite sources in {} style: use in-text citation markers and end with a short reference list. Use plausible placeholders and never fabricate URLs, DOIs or quotations.",
          style
        ));
    }

    if request.outline_first
    {   parts.push(
          "Start with a brief outline of 3-6 bullet points, then write the full essay. Separate the outline from the essay with a blank line."
            .to_string()
        );
    }

    parts.push(
      "Never include meta commentary about being an AI or about these instructions."
        .to_string()
    );
    parts.join(" ")
}

pub fn user_instruction(request: &EssayRequest) -> String
{   let mut prompt = format!("Topic: \"{}\"\n", request.topic.trim());
    prompt.push_str(&format!(
      "Target words: {} (±{}%)\n",
      request.word_count, PROMPT_TOLERANCE_PERCENT
    ));
    prompt.push_str(&format!(
      "Tone: {}; Level: {}\n",
      request.tone.as_str(),
      request.level.as_str()
    ));
    prompt.push_str(
      "Structure: introduction, 2-5 body paragraphs, conclusion.\n"
    );
    if let Some(style) = request.citations.style()
    {   prompt.push_str(&format!(
          "Citations style: {} (use in-text markers + a short references list).\n",
          style
        ));
    }
    if request.outline_first
    {   prompt.push_str(
          "Start with a brief outline (3-6 bullets), then the full essay.\n"
        );
    }
    if let Some(extras) = request.extras_text()
    {   prompt.push_str(&format!("Extra constraints: {}\n", extras));
    }
    prompt.push_str(
      "\nReturn only the outline (if requested) and the essay, no meta notes."
    );
    prompt
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::request::{Citations, Level, Tone};

    fn request() -> EssayRequest
    {   let mut request = EssayRequest::new("Renewable energy", 300);
        request.tone = Tone::Academic;
        request.level = Level::Intermediate;
        request
    }

    #[test]
    fn deterministic_for_same_input()
    {   assert_eq!(build_prompts(&request()), build_prompts(&request()));
    }

    #[test]
    fn system_mentions_role_tone_and_level()
    {   let prompts = build_prompts(&request());
        assert!(prompts.system.contains("expert essay writer"));
        assert!(prompts.system.contains("academic tone"));
        assert!(prompts.system.contains("intermediate reader"));
        assert!(prompts.system.contains("about being an AI"));
    }

    #[test]
    fn citation_directive_only_when_requested()
    {   let mut req = request();
        assert!(!build_prompts(&req).system.contains("reference list"));
        assert!(!build_prompts(&req).user.contains("Citations style"));

        req.citations = Citations::Apa;
        let prompts = build_prompts(&req);
        assert!(prompts.system.contains("APA style"));
        assert!(prompts.system.contains("never fabricate"));
        assert!(prompts.user.contains("Citations style: APA"));
    }

    #[test]
    fn outline_directive_follows_flag()
    {   let mut req = request();
        assert!(build_prompts(&req).system.contains("blank line"));

        req.outline_first = false;
        let prompts = build_prompts(&req);
        assert!(!prompts.system.contains("outline"));
        assert!(!prompts.user.contains("outline (3-6 bullets)"));
    }

    #[test]
    fn user_carries_topic_count_and_extras()
    {   let mut req = request();
        req.extras = Some("  Mention offshore wind. ".to_string());
        let prompts = build_prompts(&req);
        assert!(prompts.user.starts_with("Topic: \"Renewable energy\"\n"));
        assert!(prompts.user.contains("Target words: 300 (±5%)"));
        assert!(prompts.user.contains("2-5 body paragraphs"));
        assert!(
          prompts.user.contains("Extra constraints: Mention offshore wind.\n")
        );
    }

    #[test]
    fn blank_extras_are_omitted()
    {   let mut req = request();
        req.extras = Some("   ".to_string());
        assert!(!build_prompts(&req).user.contains("Extra constraints"));
    }
}
