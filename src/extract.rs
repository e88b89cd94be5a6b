//! Candidate extraction from free-form model output
//!
//! Models follow the requested JSON shape only loosely, so the text
//! goes through an ordered list of stages and the first one that
//! yields something wins:
//!
//! 1. strict decode of `{"candidates":[{"word","note"}]}`
//! 2. lenient walk over any `candidates` list
//! 3. one candidate per line of prose
//!
//! Fences and surrounding prose are stripped once up front.

use serde::Deserialize;
use serde_json::Value;
use log::{debug, trace, warn};

use crate::error::Error;
use crate::Candidate;

/// Strict wire shape, `word` and `note` both required
#[derive(Debug, Deserialize)]
struct CandidateEnvelope
{   candidates: Vec<Candidate>
}

/// Model text plus the JSON payload carved out of it
struct Prepared<'a>
{   raw: &'a str
  , payload: String
  , /// payload parsed as a JSON object
    is_object: bool
}

type Stage = fn(&Prepared<'_>) -> Option<Vec<Candidate>>;

const STAGES: [(&str, Stage); 3] =
  [ ("strict", decode_strict)
  , ("lenient", decode_lenient)
  , ("lines", decode_lines)
  ];

/// Extract candidates in model order.
///
/// A strict decode is returned as-is, even when its list is empty;
/// the other stages only succeed with at least one candidate.
pub fn extract_candidates(text: &str) -> Result<Vec<Candidate>, Error>
{   let payload = clean_json_payload(text);
    let is_object = parses_as_object(&payload);
    trace!("Extraction payload: {}", payload);
    let prepared = Prepared { raw: text, payload, is_object };

    for (name, stage) in STAGES
    {   if let Some(candidates) = stage(&prepared)
        {   debug!(
              "Extracted {} candidates via {} stage",
              candidates.len(), name
            );
            return Ok(candidates);
        }
    }
    warn!("No candidates recoverable from model output");
    Err(Error::Parse)
}

/// Strip code fences and surrounding prose down to a JSON object.
///
/// A leading fence loses its first line and everything from the last
/// fence on. The outermost `{...}` wins when it parses as an object;
/// otherwise a bare `[...]` that parses once wrapped as
/// `{"candidates": [...]}` is taken. Failing both, the brace span (or
/// the whole text) is handed on for the later stages.
pub fn clean_json_payload(text: &str) -> String
{   let mut s = text.trim();
    if s.starts_with("```")
    {   s = match s.find('\n')
        {   Some(idx) => &s[idx + 1..]
          , None => ""
        };
        if let Some(end) = s.rfind("```")
        {   s = &s[..end];
        }
        s = s.trim();
    }

    let object = span(s, '{', '}').map(|(start, end)| &s[start..=end]);
    if let Some(object) = object
    {   if parses_as_object(object)
        {   return object.to_string();
        }
    }
    if let Some((start, end)) = span(s, '[', ']')
    {   let wrapped = wrap_array(&s[start..=end]);
        if parses_as_object(&wrapped)
        {   return wrapped;
        }
    }
    object.unwrap_or(s).to_string()
}

fn parses_as_object(s: &str) -> bool
{   serde_json::from_str::<Value>(s)
      .map(|v| v.is_object())
      .unwrap_or(false)
}

/// Byte range from the first `open` to the last `close`
fn span(s: &str, open: char, close: char) -> Option<(usize, usize)>
{   let start = s.find(open)?;
    let end = s.rfind(close)?;
    if start < end { Some((start, end)) } else { None }
}

fn wrap_array(array: &str) -> String
{   format!("{{\"candidates\": {}}}", array)
}

fn decode_strict(prepared: &Prepared<'_>) -> Option<Vec<Candidate>>
{   serde_json::from_str::<CandidateEnvelope>(&prepared.payload)
      .map(|env| env.candidates)
      .map_err(|e| trace!("Strict decode failed: {}", e))
      .ok()
}

/// First string-valued field among `keys`, trimmed
fn first_str(item: &Value, keys: &[&str]) -> String
{   keys.iter()
      .find_map(|k| item.get(*k).and_then(Value::as_str))
      .map(|s| s.trim().to_string())
      .unwrap_or_default()
}

fn decode_lenient(prepared: &Prepared<'_>) -> Option<Vec<Candidate>>
{   if !prepared.is_object
    {   return None;
    }
    let root: Value = serde_json::from_str(&prepared.payload).ok()?;
    let list = root.get("candidates")?.as_array()?;

    let candidates: Vec<Candidate> = list
      .iter()
      .filter_map(|item| {
        let (word, note) = match item
        {   Value::String(s) => (s.trim().to_string(), String::new())
          , Value::Object(_) => (
              first_str(item, &["word", "text", "sentence"])
            , first_str(item, &["note", "style"])
            )
          , _ => return None
        };
        if word.is_empty() { None } else { Some(Candidate { word, note }) }
      })
      .collect();

    if candidates.is_empty() { None } else { Some(candidates) }
}

/// Only for output with no recoverable JSON object
fn decode_lines(prepared: &Prepared<'_>) -> Option<Vec<Candidate>>
{   if prepared.is_object
    {   return None;
    }
    let candidates: Vec<Candidate> = prepared.raw
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty() && !line.starts_with("```"))
      .filter_map(|line| {
        let line = line.replace("```", "");
        split_line(strip_marker(line.trim()))
      })
      .collect();

    if candidates.is_empty() { None } else { Some(candidates) }
}

const BULLETS: [char; 6] = ['-', '*', '•', '·', '・', '+'];
const ORDINAL_ENDS: [char; 5] = ['.', ')', '、', '．', '）'];

/// Drop a leading `1.` / `2)` / `3、` / `-` / `•` marker
fn strip_marker(line: &str) -> &str
{   if let Some(rest) = line.strip_prefix(&BULLETS[..])
    {   return rest.trim_start();
    }
    let digits = line
      .char_indices()
      .find(|(_, c)| !c.is_ascii_digit())
      .map(|(idx, _)| idx)
      .unwrap_or(line.len());
    if digits > 0
    {   if let Some(rest) = line[digits..].strip_prefix(&ORDINAL_ENDS[..])
        {   return rest.trim_start();
        }
    }
    line
}

const SEPARATORS: [&str; 5] = ["：", ":", " - ", " — ", " – "];

/// `word<sep>note`, splitting at the earliest separator
fn split_line(line: &str) -> Option<Candidate>
{   let split = SEPARATORS
      .iter()
      .filter_map(|sep| line.find(sep).map(|idx| (idx, sep.len())))
      .min_by_key(|(idx, _)| *idx);

    let (word, note) = match split
    {   Some((idx, len)) => (&line[..idx], &line[idx + len..])
      , None => (line, "")
    };
    let word = word.trim().trim_matches('*').trim();
    if word.is_empty()
    {   return None;
    }
    Some(Candidate::new(word, note.trim()))
}
