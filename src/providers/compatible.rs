use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{debug, trace, error};
use std::time::Duration;

use crate::config::{ProviderConfig, RequestStyle};
use crate::error::Error;
use crate::request::{HttpRequest, RequestSpec};
use crate::Provider;

/// Raw-body preview attached to empty-content errors
const PREVIEW_CHARS: usize = 600;

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub temperature: f64
  , pub max_tokens: u32
  , pub stream: bool
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest
{   pub model: String
  , pub prompt: String
  , pub temperature: f64
  , pub max_tokens: u32
  , pub stream: bool
}

// ===== Codec =====

/// Codec for OpenAI-compatible endpoints; the style picks
/// between chat `messages` and a legacy `prompt` body
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibleCodec
{   pub style: RequestStyle
}

impl CompatibleCodec
{   pub fn new(style: RequestStyle) -> Self
    {   CompatibleCodec { style }
    }

    fn body(&self, spec: &RequestSpec, model: &str)
      -> Result<Value, Error>
    {   let encoded = match self.style
        {   RequestStyle::Chat => serde_json::to_value(ChatRequest
            {   model: model.to_string()
              , messages: vec![
                  ChatMessage
                  {   role: "system".to_string()
                    , content: spec.system_prompt.clone()
                  }
                , ChatMessage
                  {   role: "user".to_string()
                    , content: spec.user_prompt.clone()
                  }
                ]
              , temperature: spec.temperature
              , max_tokens: spec.max_output_size
              , stream: false
            })
          , RequestStyle::Completion => serde_json::to_value(CompletionRequest
            {   model: model.to_string()
              , prompt: format!(
                  "{}\n\n{}", spec.system_prompt, spec.user_prompt
                )
              , temperature: spec.temperature
              , max_tokens: spec.max_output_size
              , stream: false
            })
        };
        encoded.map_err(|e| {
          error!("Failed to encode request: {}", e);
          Error::Other(e.to_string())
        })
    }
}

/// `content` as a plain string or a list of `{text}` parts
fn content_text(content: &Value) -> Option<String>
{   match content
    {   Value::String(s) => Some(s.clone())
      , Value::Array(parts) => {
          let joined: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
          Some(joined)
        }
      , _ => None
    }
}

/// message.content, then delta.content, then text of the first choice
fn choice_text(root: &Value) -> Option<String>
{   let choice = root.get("choices")?.get(0)?;
    let non_empty = |t: String| if t.trim().is_empty() { None } else { Some(t) };
    choice.get("message")
      .and_then(|m| m.get("content"))
      .and_then(content_text)
      .and_then(non_empty)
      .or_else(|| choice.get("delta")
        .and_then(|d| d.get("content"))
        .and_then(content_text)
        .and_then(non_empty))
      .or_else(|| choice.get("text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .and_then(non_empty))
}

impl super::ProviderCodec for CompatibleCodec
{   fn provider(&self) -> Provider
    {   Provider::Compatible
    }

    fn encode(
      &self
    , spec: &RequestSpec
    , config: &ProviderConfig
    , timeout: Duration
    ) -> Result<HttpRequest, Error>
    {   let key = super::require_key(self.provider(), config)?;
        let url = super::require_url(self.provider(), &config.base_url)?;

        let body = self.body(spec, &config.model)?;
        debug!("Compatible request in {:?} style", self.style);
        trace!("Compatible request body: {}", body);

        Ok(HttpRequest::post_json(url.as_str(), body, timeout)
          .with_header("Authorization", super::bearer(key)))
    }

    fn decode(&self, status: u16, body: &str) -> Result<String, Error>
    {   let parsed = super::parse_body(body);
        super::check_envelope(self.provider(), status, &parsed)?;

        // Some gateways wrap the real payload in `data`
        let root = match parsed.get("data")
        {   Some(data @ Value::Object(_)) => data
          , _ => &parsed
        };

        match choice_text(root)
        {   Some(text) => Ok(text)
          , None => {
              error!("Compatible API returned empty content");
              Err(Error::EmptyContent(format!(
                "{} returned empty content: {}"
              , self.provider()
              , super::preview(body, PREVIEW_CHARS)
              )))
            }
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::providers::ProviderCodec;

    fn spec() -> RequestSpec
    {   RequestSpec
        {   system_prompt: "SYS".to_string()
          , user_prompt: "USER".to_string()
          , max_output_size: 320
          , temperature: 0.5
        }
    }

    fn config() -> ProviderConfig
    {   ProviderConfig::new(
          "https://api.deepseek.com/chat/completions", "k-1", "deepseek-chat"
        )
    }

    #[test]
    fn chat_style_sends_system_then_user()
    {   let req = CompatibleCodec::new(RequestStyle::Chat)
          .encode(&spec(), &config(), Duration::from_secs(30))
          .unwrap();
        let messages = req.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "SYS");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(req.body["stream"], false);
        assert_eq!(req.body["max_tokens"], 320);
        assert!(req.body.get("prompt").is_none());
        assert_eq!(req.header("Authorization"), Some("Bearer k-1"));
    }

    #[test]
    fn completion_style_joins_prompt_with_blank_line()
    {   let req = CompatibleCodec::new(RequestStyle::Completion)
          .encode(&spec(), &config(), Duration::from_secs(30))
          .unwrap();
        assert_eq!(req.body["prompt"], "SYS\n\nUSER");
        assert!(req.body.get("messages").is_none());
        assert_eq!(req.body["model"], "deepseek-chat");
    }

    #[test]
    fn decode_prefers_message_content()
    {   let codec = CompatibleCodec::default();
        let body = r#"{"choices":[{"message":{"content":"hello"},"text":"ignored"}]}"#;
        assert_eq!(codec.decode(200, body).unwrap(), "hello");
    }

    #[test]
    fn decode_falls_back_to_delta_then_text()
    {   let codec = CompatibleCodec::default();
        let delta = r#"{"choices":[{"delta":{"content":"from delta"}}]}"#;
        assert_eq!(codec.decode(200, delta).unwrap(), "from delta");
        let legacy = r#"{"choices":[{"text":"legacy"}]}"#;
        assert_eq!(codec.decode(200, legacy).unwrap(), "legacy");
    }

    #[test]
    fn decode_joins_content_parts()
    {   let codec = CompatibleCodec::default();
        let body = r#"{"choices":[{"message":{"content":[{"type":"text","text":"a"},{"type":"text","text":"b"}]}}]}"#;
        assert_eq!(codec.decode(200, body).unwrap(), "ab");
    }

    #[test]
    fn decode_unwraps_data_field()
    {   let codec = CompatibleCodec::default();
        let body = r#"{"code":0,"data":{"choices":[{"message":{"content":"wrapped"}}]}}"#;
        assert_eq!(codec.decode(200, body).unwrap(), "wrapped");
    }

    #[test]
    fn empty_content_carries_body_preview()
    {   let codec = CompatibleCodec::default();
        let body = r#"{"choices":[{"message":{"content":""}}]}"#;
        match codec.decode(200, body)
        {   Err(Error::EmptyContent(msg)) => {
              assert!(msg.starts_with("Compatible API returned empty content"));
              assert!(msg.contains(r#""choices""#));
            }
          , other => panic!("unexpected: {:?}", other)
        }
    }
}
