//! Anthropic Messages API

use log::trace;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::request::{HttpRequest, RequestSpec};
use crate::Provider;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicCodec;

impl super::ProviderCodec for AnthropicCodec
{   fn provider(&self) -> Provider
    {   Provider::Anthropic
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
          "system": spec.system_prompt,
          "messages": [
            { "role": "user", "content": spec.user_prompt }
          ],
          "temperature": spec.temperature,
          "max_tokens": spec.max_output_size
        });
        trace!("Anthropic request body: {}", body);

        Ok(HttpRequest::post_json(url.as_str(), body, timeout)
          .with_header("x-api-key", key)
          .with_header("anthropic-version", ANTHROPIC_VERSION))
    }

    fn decode(&self, status: u16, body: &str) -> Result<String, Error>
    {   let root = super::parse_body(body);
        super::check_envelope(self.provider(), status, &root)?;

        let text = root.get("content")
          .and_then(Value::as_array)
          .and_then(|blocks| blocks
            .iter()
            .find(|b| b.get("type").and_then(Value::as_str) == Some("text")))
          .and_then(|b| b.get("text"))
          .and_then(Value::as_str)
          .map(str::to_string);
        super::require_text(self.provider(), text)
    }
}
