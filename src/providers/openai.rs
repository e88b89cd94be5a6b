//! OpenAI Responses API with a strict JSON schema on the output

use log::{debug, trace};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::{ProviderConfig, MAX_COUNT};
use crate::error::Error;
use crate::request::{HttpRequest, RequestSpec};
use crate::Provider;

/// Codec for the structured-output (Responses) style
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiCodec;

/// Schema the model output must satisfy
fn candidates_schema() -> Value
{   json!({
      "type": "object",
      "additionalProperties": false,
      "required": ["candidates"],
      "properties": {
        "candidates": {
          "type": "array",
          "minItems": 1,
          "maxItems": MAX_COUNT,
          "items": {
            "type": "object",
            "additionalProperties": false,
            "required": ["word", "note"],
            "properties": {
              "word": { "type": "string" },
              "note": { "type": "string" }
            }
          }
        }
      }
    })
}

impl super::ProviderCodec for OpenAiCodec
{   fn provider(&self) -> Provider
    {   Provider::OpenAI
    }

    fn encode(
      &self
    , spec: &RequestSpec
    , config: &ProviderConfig
    , timeout: Duration
    ) -> Result<HttpRequest, Error>
    {   let key = super::require_key(self.provider(), config)?;
        let url = super::require_url(self.provider(), &config.base_url)?;

        let body = json!({
          "model": config.model,
          "instructions": spec.system_prompt,
          "input": spec.user_prompt,
          "temperature": spec.temperature,
          "max_output_tokens": spec.max_output_size,
          "text": {
            "format": {
              "type": "json_schema",
              "name": "candidates",
              "strict": true,
              "schema": candidates_schema()
            }
          }
        });
        trace!("OpenAI request body: {}", body);

        Ok(HttpRequest::post_json(url.as_str(), body, timeout)
          .with_header("Authorization", super::bearer(key)))
    }

    fn decode(&self, status: u16, body: &str) -> Result<String, Error>
    {   let root = super::parse_body(body);
        super::check_envelope(self.provider(), status, &root)?;

        let mut text = String::new();
        let messages = root.get("output")
          .and_then(Value::as_array)
          .into_iter()
          .flatten()
          .filter(|item| item.get("type").and_then(Value::as_str) == Some("message"));
        for message in messages
        {   let parts = message.get("content")
              .and_then(Value::as_array)
              .into_iter()
              .flatten()
              .filter(|p| p.get("type").and_then(Value::as_str) == Some("output_text"));
            for part in parts
            {   if let Some(t) = part.get("text").and_then(Value::as_str)
                {   text.push_str(t);
                }
            }
        }
        debug!("OpenAI output text: {} chars", text.chars().count());
        super::require_text(self.provider(), Some(text))
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::providers::ProviderCodec;

    fn spec() -> RequestSpec
    {   RequestSpec
        {   system_prompt: "sys".to_string()
          , user_prompt: "词语：高兴".to_string()
          , max_output_size: 240
          , temperature: 0.4
        }
    }

    fn config() -> ProviderConfig
    {   ProviderConfig::new(
          "https://api.openai.com/v1/responses", "sk-test", "gpt-4.1-mini"
        )
    }

    #[test]
    fn encode_carries_schema_and_bearer()
    {   let req = OpenAiCodec
          .encode(&spec(), &config(), Duration::from_secs(30))
          .unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "https://api.openai.com/v1/responses");
        assert_eq!(req.header("authorization"), Some("Bearer sk-test"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body["instructions"], "sys");
        assert_eq!(req.body["input"], "词语：高兴");
        assert_eq!(req.body["max_output_tokens"], 240);
        let schema = &req.body["text"]["format"]["schema"];
        assert_eq!(schema["properties"]["candidates"]["maxItems"], 12);
        assert_eq!(schema["properties"]["candidates"]["minItems"], 1);
        assert_eq!(req.timeout, Duration::from_secs(30));
    }

    #[test]
    fn decode_concatenates_output_text_in_order()
    {   let body = r#"{
          "output": [
            {"type": "reasoning", "content": [{"type": "output_text", "text": "skip"}]},
            {"type": "message", "content": [
              {"type": "output_text", "text": "{\"candidates\":"},
              {"type": "refusal", "text": "nope"},
              {"type": "output_text", "text": "[]}"}
            ]}
          ]
        }"#;
        assert_eq!(
          OpenAiCodec.decode(200, body).unwrap()
        , "{\"candidates\":[]}"
        );
    }

    #[test]
    fn decode_without_message_is_empty_content()
    {   let err = OpenAiCodec.decode(200, r#"{"output": []}"#).unwrap_err();
        assert_eq!(
          err
        , Error::EmptyContent("OpenAI returned empty content".to_string())
        );
    }
}
