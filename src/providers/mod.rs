//! LLM provider implementations
//!
//! Each provider family is one [`ProviderCodec`]: `encode` turns a
//! [`RequestSpec`] into an [`HttpRequest`] without touching the
//! network, `decode` turns status + body back into the model's text.

pub mod openai;
pub mod compatible;
pub mod anthropic;
pub mod google;

use log::{debug, error};
use serde_json::Value;
use std::time::Duration;

use crate::config::{ProviderConfig, Settings};
use crate::error::Error;
use crate::request::{HttpRequest, RequestSpec};
use crate::Provider;

// Re-export for convenience
pub use anthropic::AnthropicCodec;
pub use compatible::CompatibleCodec;
pub use google::GoogleCodec;
pub use openai::OpenAiCodec;

/// Encode/decode pair for one provider family
pub trait ProviderCodec: Send + Sync
{   /// Which provider this codec speaks for
    fn provider(&self) -> Provider;

    /// Build the HTTP request; fails on bad config before any I/O
    fn encode(
      &self
    , spec: &RequestSpec
    , config: &ProviderConfig
    , timeout: Duration
    ) -> Result<HttpRequest, Error>;

    /// Pull the model's answer text out of the response envelope
    fn decode(&self, status: u16, body: &str) -> Result<String, Error>;

    fn name(&self) -> &'static str
    {   self.provider().display_name()
    }
}

/// Codec for the active provider in `settings`
pub fn codec_for(settings: &Settings) -> Box<dyn ProviderCodec>
{   match settings.provider
    {   Provider::OpenAI => Box::new(OpenAiCodec)
      , Provider::Compatible => Box::new(
          CompatibleCodec::new(settings.compatible_style)
        )
      , Provider::Anthropic => Box::new(AnthropicCodec)
      , Provider::Google => Box::new(GoogleCodec)
    }
}

// ===== Shared encoder helpers =====

/// Trimmed API key, or a configuration error naming the provider
pub(crate) fn require_key<'a>(
  provider: Provider
, config: &'a ProviderConfig
) -> Result<&'a str, Error>
{   let key = config.api_key.trim();
    if key.is_empty()
    {   error!("No API key for {}", provider);
        return Err(Error::Configuration(format!(
          "{} API key is not set", provider
        )));
    }
    Ok(key)
}

/// Parsed http(s) URL, or a configuration error naming the provider
pub(crate) fn require_url(
  provider: Provider
, raw: &str
) -> Result<reqwest::Url, Error>
{   let raw = raw.trim();
    if raw.is_empty()
    {   error!("No base URL for {}", provider);
        return Err(Error::Configuration(format!(
          "{} base URL is not set", provider
        )));
    }
    match reqwest::Url::parse(raw)
    {   Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url)
      , _ => {
          error!("Invalid base URL for {}: {}", provider, raw);
          Err(Error::Configuration(format!(
            "{} base URL is invalid: {}", provider, raw
          )))
        }
    }
}

/// Bearer auth header value
pub(crate) fn bearer(key: &str) -> String
{   format!("Bearer {}", key)
}

// ===== Shared decoder helpers =====

/// Parse a response body; anything that is not JSON becomes Null
pub(crate) fn parse_body(body: &str) -> Value
{   serde_json::from_str(body).unwrap_or_else(|e| {
      debug!("Response body is not JSON: {}", e);
      Value::Null
    })
}

/// Error message carried inside the body, if any.
/// Looks at `error.message`, a bare string `error`, and the same
/// two shapes under a `data` wrapper.
pub(crate) fn envelope_error(root: &Value) -> Option<String>
{   fn at(node: &Value) -> Option<String>
    {   match node.get("error")?
        {   Value::String(msg) if !msg.trim().is_empty() => {
              Some(msg.clone())
            }
          , err @ Value::Object(_) => {
              err.get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string)
            }
          , _ => None
        }
    }
    at(root).or_else(|| root.get("data").and_then(at))
}

/// Body error first, then status; `Ok` means go on extracting
pub(crate) fn check_envelope(
  provider: Provider
, status: u16
, root: &Value
) -> Result<(), Error>
{   if let Some(msg) = envelope_error(root)
    {   error!("{} returned error object: {}", provider, msg);
        return Err(Error::Provider(msg));
    }
    if status >= 400
    {   error!("{} returned HTTP {}", provider, status);
        return Err(Error::Provider(format!(
          "{} request failed: HTTP {}", provider, status
        )));
    }
    Ok(())
}

/// Non-blank text, or the provider's empty-content error
pub(crate) fn require_text(
  provider: Provider
, text: Option<String>
) -> Result<String, Error>
{   match text
    {   Some(t) if !t.trim().is_empty() => Ok(t)
      , _ => {
          error!("{} returned empty content", provider);
          Err(Error::EmptyContent(format!(
            "{} returned empty content", provider
          )))
        }
    }
}

/// First `max_chars` characters of `body`
pub(crate) fn preview(body: &str, max_chars: usize) -> String
{   match body.char_indices().nth(max_chars)
    {   Some((idx, _)) => body[..idx].to_string()
      , None => body.to_string()
    }
}
