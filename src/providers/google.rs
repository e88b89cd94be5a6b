//! Google Gemini generateContent

use log::{debug, error, trace};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::request::{HttpRequest, RequestSpec};
use crate::Provider;
use super::ProviderCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleCodec;

impl GoogleCodec
{   /// `{base}/{model}:generateContent?key={key}`
    fn endpoint(&self, config: &ProviderConfig, key: &str)
      -> Result<String, Error>
    {   let base = super::require_url(self.provider(), &config.base_url)?;
        let model = config.model.trim();
        if model.is_empty()
        {   error!("No Gemini model configured");
            return Err(Error::Configuration(
              "Gemini model is not set".to_string()
            ));
        }
        let raw = format!(
          "{}/{}:generateContent"
        , base.as_str().trim_end_matches('/')
        , model
        );
        let mut url = reqwest::Url::parse(&raw).map_err(|e| {
          error!("Invalid Gemini request URL {}: {}", raw, e);
          Error::Configuration(format!("Gemini request URL is invalid: {}", raw))
        })?;
        url.query_pairs_mut().append_pair("key", key);
        Ok(url.into())
    }
}

impl ProviderCodec for GoogleCodec
{   fn provider(&self) -> Provider
    {   Provider::Google
    }

    fn encode(
      &self
    , spec: &RequestSpec
    , config: &ProviderConfig
    , timeout: Duration
    ) -> Result<HttpRequest, Error>
    {   let key = super::require_key(self.provider(), config)?;
        let url = self.endpoint(config, key)?;
        debug!("Gemini endpoint for model {}", config.model);

        let body = json!({
          "systemInstruction": {
            "role": "system",
            "parts": [ { "text": spec.system_prompt } ]
          },
          "contents": [
            { "role": "user", "parts": [ { "text": spec.user_prompt } ] }
          ],
          "generationConfig": {
            "temperature": spec.temperature,
            "maxOutputTokens": spec.max_output_size
          }
        });
        trace!("Gemini request body: {}", body);

        // The key travels in the query string, no auth header
        Ok(HttpRequest::post_json(url, body, timeout))
    }

    fn decode(&self, status: u16, body: &str) -> Result<String, Error>
    {   let root = super::parse_body(body);
        super::check_envelope(self.provider(), status, &root)?;

        let text = root.pointer("/candidates/0/content/parts/0/text")
          .and_then(Value::as_str)
          .map(str::to_string);
        super::require_text(self.provider(), text)
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    fn spec() -> RequestSpec
    {   RequestSpec
        {   system_prompt: "sys".to_string()
          , user_prompt: "user".to_string()
          , max_output_size: 240
          , temperature: 0.9
        }
    }

    #[test]
    fn endpoint_appends_model_and_key()
    {   let config = ProviderConfig::new(
          "https://generativelanguage.googleapis.com/v1beta/models/"
        , "g-key"
        , "gemini-2.0-flash"
        );
        let req = GoogleCodec
          .encode(&spec(), &config, Duration::from_secs(30))
          .unwrap();
        assert_eq!(
          req.url
        , "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=g-key"
        );
        assert_eq!(req.header("Authorization"), None);
        assert_eq!(req.header("x-api-key"), None);
        assert_eq!(req.body["systemInstruction"]["role"], "system");
        assert_eq!(req.body["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(req.body["contents"][0]["role"], "user");
        assert_eq!(req.body["contents"][0]["parts"][0]["text"], "user");
        assert_eq!(req.body["generationConfig"]["maxOutputTokens"], 240);
    }

    #[test]
    fn missing_key_fails_before_url()
    {   let config = ProviderConfig::new("not a url", "", "gemini");
        assert_eq!(
          GoogleCodec.encode(&spec(), &config, Duration::from_secs(30))
        , Err(Error::Configuration("Gemini API key is not set".to_string()))
        );
    }

    #[test]
    fn decode_reads_first_part()
    {   let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"答案"}]}}]}"#;
        assert_eq!(GoogleCodec.decode(200, body).unwrap(), "答案");
    }

    #[test]
    fn decode_blocked_prompt_is_empty_content()
    {   let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert_eq!(
          GoogleCodec.decode(200, body)
        , Err(Error::EmptyContent("Gemini returned empty content".to_string()))
        );
    }
}
