//! Settings for the active provider and the query defaults
//!
//! The settings value is handed to every call explicitly; nothing
//! here is global. A front end persists it however it likes and
//! the CLI loads it from a JSON file plus env overrides.

use serde::{Deserialize, Serialize};
use log::{debug, warn};
use std::path::Path;

use crate::error::Error;
use crate::{Mode, Provider};

/// Upper bound on candidates per request, matches the
/// structured-output schema's maxItems
pub const MAX_COUNT: usize = 12;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoint, credentials and model for one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig
{   /// Endpoint URL (Google: the models base, model is appended)
    pub base_url: String
  , /// API key, sent as header or query depending on provider
    pub api_key: String
  , /// Model name
    pub model: String
}

impl ProviderConfig
{   pub fn new(
      base_url: impl Into<String>
    , api_key: impl Into<String>
    , model: impl Into<String>
    ) -> Self
    {   ProviderConfig
        {   base_url: base_url.into()
          , api_key: api_key.into()
          , model: model.into()
        }
    }

    /// Stock endpoint and model for a provider, no key
    pub fn defaults_for(provider: Provider) -> Self
    {   match provider
        {   Provider::OpenAI => ProviderConfig::new(
              "https://api.openai.com/v1/responses"
            , ""
            , "gpt-4.1-mini"
            )
          , Provider::Compatible => ProviderConfig::new(
              "https://api.deepseek.com/chat/completions"
            , ""
            , "deepseek-chat"
            )
          , Provider::Anthropic => ProviderConfig::new(
              "https://api.anthropic.com/v1/messages"
            , ""
            , "claude-3-5-haiku-latest"
            )
          , Provider::Google => ProviderConfig::new(
              "https://generativelanguage.googleapis.com/v1beta/models"
            , ""
            , "gemini-2.0-flash"
            )
        }
    }

    /// Replace blank url/model with the provider's stock values
    fn fill_blanks(&mut self, provider: Provider)
    {   let stock = ProviderConfig::defaults_for(provider);
        if self.base_url.trim().is_empty()
        {   self.base_url = stock.base_url;
        }
        if self.model.trim().is_empty()
        {   self.model = stock.model;
        }
    }
}

/// Wire contract spoken by a compatible endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStyle
{   /// role-tagged `messages`
    #[default]
    Chat
  , /// single legacy `prompt` string
    Completion
}

impl RequestStyle
{   pub fn from_id(id: &str) -> Option<RequestStyle>
    {   match id.trim().to_ascii_lowercase().as_str()
        {   "chat" => Some(RequestStyle::Chat)
          , "completion" | "completions" => Some(RequestStyle::Completion)
          , _ => None
        }
    }
}

/// Flat settings consumed by the query pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings
{   /// The single active provider
    pub provider: Provider
  , pub openai: ProviderConfig
  , pub compatible: ProviderConfig
  , pub compatible_style: RequestStyle
  , pub anthropic: ProviderConfig
  , pub google: ProviderConfig
  , /// Sampling temperature, 0.0..=1.0
    pub temperature: f64
  , /// Candidates requested in word mode
    pub word_count: usize
  , /// Rewrites requested in sentence mode
    pub sentence_count: usize
  , /// Per HTTP call timeout
    pub timeout_secs: u64
}

impl Default for Settings
{   fn default() -> Self
    {   Settings
        {   provider: Provider::OpenAI
          , openai: ProviderConfig::defaults_for(Provider::OpenAI)
          , compatible: ProviderConfig::defaults_for(Provider::Compatible)
          , compatible_style: RequestStyle::Chat
          , anthropic: ProviderConfig::defaults_for(Provider::Anthropic)
          , google: ProviderConfig::defaults_for(Provider::Google)
          , temperature: 0.7
          , word_count: 5
          , sentence_count: 3
          , timeout_secs: DEFAULT_TIMEOUT_SECS
        }
    }
}

impl Settings
{   /// Parse settings from JSON; absent fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, Error>
    {   let mut settings: Settings = serde_json::from_str(json)
          .map_err(|e| Error::InvalidSettings(e.to_string()))?;
        for provider in ALL_PROVIDERS
        {   settings.config_for_mut(provider).fill_blanks(provider);
        }
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error>
    {   let path = path.as_ref();
        debug!("Loading settings from {}", path.display());
        let json = std::fs::read_to_string(path)
          .map_err(|e| Error::InvalidSettings(
            format!("{}: {}", path.display(), e)
          ))?;
        Settings::from_json_str(&json)
    }

    /// Overlay `ALTPHRASE_*` environment variables
    pub fn apply_env(&mut self)
    {   self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars<F>(&mut self, lookup: F)
    where F: Fn(&str) -> Option<String>
    {   if let Some(id) = lookup("ALTPHRASE_PROVIDER")
        {   match Provider::from_id(&id)
            {   Some(p) => self.provider = p
              , None => warn!("Ignoring unknown provider: {}", id)
            }
        }
        if let Some(style) = lookup("ALTPHRASE_COMPATIBLE_STYLE")
        {   match RequestStyle::from_id(&style)
            {   Some(s) => self.compatible_style = s
              , None => warn!("Ignoring unknown request style: {}", style)
            }
        }
        for provider in ALL_PROVIDERS
        {   let prefix = env_prefix(provider);
            let config = self.config_for_mut(provider);
            if let Some(key) = lookup(&format!("{}_API_KEY", prefix))
            {   config.api_key = key;
            }
            if let Some(url) = lookup(&format!("{}_BASE_URL", prefix))
            {   config.base_url = url;
            }
            if let Some(model) = lookup(&format!("{}_MODEL", prefix))
            {   config.model = model;
            }
        }
    }

    /// Range checks for the numeric fields
    pub fn validate(&self) -> Result<(), Error>
    {   if !(0.0..=1.0).contains(&self.temperature)
        {   return Err(Error::InvalidSettings(format!(
              "temperature {} is outside 0.0..=1.0"
            , self.temperature
            )));
        }
        for (name, count) in
          [("word_count", self.word_count)
          , ("sentence_count", self.sentence_count)]
        {   if count == 0 || count > MAX_COUNT
            {   return Err(Error::InvalidSettings(format!(
                  "{} {} is outside 1..={}", name, count, MAX_COUNT
                )));
            }
        }
        if self.timeout_secs == 0
        {   return Err(Error::InvalidSettings(
              "timeout_secs must be positive".to_string()
            ));
        }
        Ok(())
    }

    /// Configured result count for a mode
    pub fn count_for(&self, mode: Mode) -> usize
    {   match mode
        {   Mode::Word => self.word_count
          , Mode::Sentence => self.sentence_count
        }
    }

    pub fn config_for(&self, provider: Provider) -> &ProviderConfig
    {   match provider
        {   Provider::OpenAI => &self.openai
          , Provider::Compatible => &self.compatible
          , Provider::Anthropic => &self.anthropic
          , Provider::Google => &self.google
        }
    }

    fn config_for_mut(&mut self, provider: Provider) -> &mut ProviderConfig
    {   match provider
        {   Provider::OpenAI => &mut self.openai
          , Provider::Compatible => &mut self.compatible
          , Provider::Anthropic => &mut self.anthropic
          , Provider::Google => &mut self.google
        }
    }

    /// Config of the currently selected provider
    pub fn active_config(&self) -> &ProviderConfig
    {   self.config_for(self.provider)
    }

    pub fn timeout(&self) -> std::time::Duration
    {   std::time::Duration::from_secs(self.timeout_secs)
    }
}

const ALL_PROVIDERS: [Provider; 4] =
  [ Provider::OpenAI
  , Provider::Compatible
  , Provider::Anthropic
  , Provider::Google
  ];

fn env_prefix(provider: Provider) -> &'static str
{   match provider
    {   Provider::OpenAI => "ALTPHRASE_OPENAI"
      , Provider::Compatible => "ALTPHRASE_COMPATIBLE"
      , Provider::Anthropic => "ALTPHRASE_ANTHROPIC"
      , Provider::Google => "ALTPHRASE_GOOGLE"
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_json_keeps_defaults()
    {   let settings = Settings::from_json_str(r#"
          { "provider": "anthropic"
          , "anthropic": { "api_key": "sk-ant" }
          , "word_count": 8
          }"#).unwrap();
        assert_eq!(settings.provider, Provider::Anthropic);
        assert_eq!(settings.anthropic.api_key, "sk-ant");
        assert_eq!(
          settings.anthropic.base_url,
          "https://api.anthropic.com/v1/messages"
        );
        assert_eq!(settings.anthropic.model, "claude-3-5-haiku-latest");
        assert_eq!(settings.word_count, 8);
        assert_eq!(settings.sentence_count, 3);
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn bad_json_is_invalid_settings()
    {   let err = Settings::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::InvalidSettings(_)));
    }

    #[test]
    fn env_overrides_key_and_provider()
    {   let vars: HashMap<&str, &str> = [
          ("ALTPHRASE_PROVIDER", "gemini")
        , ("ALTPHRASE_GOOGLE_API_KEY", "g-key")
        , ("ALTPHRASE_COMPATIBLE_STYLE", "completion")
        , ("ALTPHRASE_COMPATIBLE_MODEL", "qwen-plus")
        ].into_iter().collect();

        let mut settings = Settings::default();
        settings.apply_vars(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(settings.provider, Provider::Google);
        assert_eq!(settings.active_config().api_key, "g-key");
        assert_eq!(settings.compatible_style, RequestStyle::Completion);
        assert_eq!(settings.compatible.model, "qwen-plus");
    }

    #[test]
    fn validate_rejects_out_of_range_values()
    {   let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.temperature = 1.5;
        assert!(settings.validate().is_err());

        settings.temperature = 0.2;
        settings.word_count = 0;
        assert!(settings.validate().is_err());

        settings.word_count = 13;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn count_follows_mode()
    {   let settings = Settings::default();
        assert_eq!(settings.count_for(Mode::Word), 5);
        assert_eq!(settings.count_for(Mode::Sentence), 3);
    }
}
