//! Heuristic split of raw model output into an optional outline and the
//! essay body.
//!
//! The scan is a small state machine over physical lines:
//!
//! ```text
//! Scanning --item/heading--> CollectingOutline --prose/label--> InEssayBody
//!     \------------------------prose/label------------------------^
//! ```
//!
//! Only leading bullets count as an outline. Once prose has been seen the
//! rest of the text is essay, even if it contains lists of its own.
//! Bullets wrapped over several physical lines are not merged.

use std::sync::LazyLock;
use log::{debug, trace};
use regex::Regex;

use crate::config::ParserConfig;

static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(?:\d+[.)]\s+|[-*]\s+|•\s*)(.*)$")
    .expect("valid item regex")
});

static OUTLINE_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)\boutline\b").expect("valid outline regex")
});

static LABEL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)^[#*\s]*(?:essay|content|introduction)[*\s]*:[*\s]*$")
    .expect("valid label regex")
});

static LABEL_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)^[#*\s]*(?:essay|content|introduction)[*\s]*:[*\s]*")
    .expect("valid label prefix regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState
{   Scanning
  , CollectingOutline
  , InEssayBody
}

/// What one physical line looks like to the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineKind
{   Blank
  , /// Numbered or bulleted line, prefix already stripped
    Item(String)
  , /// "Outline", "## Outline:", "**Outline for the essay:**"
    Heading
  , /// "Essay:", "Content:", "Introduction:" on a line of its own
    Label
  , Prose
    {   text: String
      , substantial: bool
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action
{   Skip
  , PushItem(String)
  , StartBody
}

/// Result of splitting one raw response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse
{   pub outline: Option<Vec<String>>
  , /// May be empty when the model produced only an outline
    pub essay: String
}

fn clean_item(text: &str) -> String
{   text.replace("**", "").trim().to_string()
}

fn classify(line: &str, prose_threshold: usize) -> LineKind
{   let trimmed = line.trim();
    if trimmed.is_empty()
    {   return LineKind::Blank;
    }

    if let Some(caps) = ITEM_RE.captures(trimmed)
    {   let item = clean_item(&caps[1]);
        if item.chars().any(char::is_alphanumeric)
        {   return LineKind::Item(item);
        }
        return LineKind::Blank;
    }

    let long = trimmed.chars().count() > prose_threshold;
    if OUTLINE_WORD_RE.is_match(trimmed)
    {   let bare = trimmed.trim_end_matches('*').trim_end();
        if !long || bare.ends_with(':') || trimmed.starts_with('#')
        {   return LineKind::Heading;
        }
    }

    if LABEL_LINE_RE.is_match(trimmed)
    {   return LineKind::Label;
    }

    LineKind::Prose
    {   text: clean_item(trimmed)
      , substantial: long
    }
}

fn transition(state: ParseState, line: LineKind) -> (ParseState, Action)
{   use ParseState::*;
    match (state, line)
    {   (InEssayBody, _) => (InEssayBody, Action::Skip)
      , (s, LineKind::Blank) => (s, Action::Skip)

      , (Scanning, LineKind::Item(item)) => {
          (CollectingOutline, Action::PushItem(item))
        }
      , (Scanning, LineKind::Heading) => (CollectingOutline, Action::Skip)
      , (Scanning, LineKind::Label) => (InEssayBody, Action::StartBody)
      , (Scanning, LineKind::Prose { substantial, .. }) => {
          if substantial
          {   (InEssayBody, Action::StartBody)
          } else
          {   (Scanning, Action::Skip)
          }
        }

      , (CollectingOutline, LineKind::Item(item)) => {
          (CollectingOutline, Action::PushItem(item))
        }
      , (CollectingOutline, LineKind::Heading) => {
          (CollectingOutline, Action::Skip)
        }
      , (CollectingOutline, LineKind::Label) => {
          (InEssayBody, Action::StartBody)
        }
      , (CollectingOutline, LineKind::Prose { text, substantial }) => {
          if substantial
          {   (InEssayBody, Action::StartBody)
          } else
          {   (CollectingOutline, Action::PushItem(text))
          }
        }
    }
}

/// Drop a leading "Essay:" style label from the body
fn strip_label(body: &str) -> String
{   LABEL_PREFIX_RE.replace(body, "").trim().to_string()
}

/// Split raw generated text into `{outline?, essay}`
pub fn parse_response(raw: &str, config: &ParserConfig)
  -> ParsedResponse
{   let lines: Vec<&str> = raw.lines().collect();
    let mut state = ParseState::Scanning;
    let mut outline = Vec::new();
    let mut found_outline = false;
    let mut body_start = None;

    for (index, line) in lines.iter().enumerate()
    {   let kind = classify(line, config.prose_threshold);
        trace!("line {} in {:?}: {:?}", index, state, kind);
        let (next, action) = transition(state, kind);
        match action
        {   Action::Skip => {}
          , Action::PushItem(item) => outline.push(item)
          , Action::StartBody => body_start = Some(index)
        }
        if next == ParseState::CollectingOutline
        {   found_outline = true;
        }
        state = next;
        if state == ParseState::InEssayBody
        {   break;
        }
    }

    if !found_outline
    {   debug!("No outline markers found; whole response is the essay");
        return ParsedResponse
        {   outline: None
          , essay: raw.trim().to_string()
        };
    }

    let essay = match body_start
    {   Some(start) => strip_label(&lines[start..].join("\n"))
      , None => String::new()
    };
    debug!(
      "Parsed outline with {} items and essay of {} chars",
      outline.len(),
      essay.len()
    );
    ParsedResponse
    {   outline: Some(outline)
      , essay
    }
}
