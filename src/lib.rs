pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod prompt;
pub mod extract;
pub mod transport;
pub mod query;
pub mod client;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use client::AltBackend;
pub use config::{ProviderConfig, RequestStyle, Settings};
pub use error::Error;
pub use query::{run_configured_query, run_query, self_test};
pub use transport::{ReqwestTransport, Transport};

/*

altphrase: ask an LLM for alternative Chinese words or sentence
rewrites and get back a short ranked list of {word, note}.

One request syntax (RequestSpec) is encoded for four provider
families, each provider's response envelope is decoded back to
plain text, and the text is squeezed into candidates no matter how
loosely the model followed the requested JSON shape.

altphrase/
├── src/
│   ├── lib.rs          # Core types and the backend API
│   ├── error.rs        # Error taxonomy
│   ├── config.rs       # Settings for the active provider
│   ├── prompt.rs       # Instruction + size budget per mode
│   ├── request.rs      # RequestSpec and HTTP value types
│   ├── providers/      # Encoders/decoders per provider family
│   ├── extract.rs      # Candidate extraction cascade
│   ├── transport.rs    # HTTP seam
│   ├── query.rs        # Pipeline: prompt -> codec -> extract
│   ├── client.rs       # Backend task owning the view state
│   └── main.rs         # CLI driver
└── tests/

*/

/// ALTPHRASE API INTERFACE:

// ===== RunQuery =====

pub type RunQueryReply = Result<Vec<Candidate>, crate::error::Error>;
pub type RunQueryReplySender
  = tokio::sync::mpsc::UnboundedSender<RunQueryReply>;

pub struct RunQueryArgs
{   pub text: String
  , pub mode: Mode
  , pub tone: Tone
  , /// Falls back to the configured count for the mode
    pub count: Option<usize>
  , pub reply: RunQueryReplySender
}

// ===== SelfTest =====

pub type SelfTestReply = Result<usize, crate::error::Error>;
pub type SelfTestReplySender
  = tokio::sync::mpsc::UnboundedSender<SelfTestReply>;

pub struct SelfTestArgs
{   pub reply: SelfTestReplySender
}

// ===== UpdateSettings =====

pub type UpdateSettingsReply = Result<(), crate::error::Error>;
pub type UpdateSettingsReplySender
  = tokio::sync::mpsc::UnboundedSender<UpdateSettingsReply>;

pub struct UpdateSettingsArgs
{   pub settings: crate::config::Settings
  , pub reply: UpdateSettingsReplySender
}

// ===== GetState =====

pub type GetStateReplySender
  = tokio::sync::mpsc::UnboundedSender<ViewState>;

pub struct GetStateArgs
{   pub reply: GetStateReplySender
}

// ===== Clear =====

pub type ClearReplySender
  = tokio::sync::mpsc::UnboundedSender<()>;

pub struct ClearArgs
{   pub reply: ClearReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== AltHand (sender side) =====

pub struct AltHand
{   pub run_query_tx
      : tokio::sync::mpsc::UnboundedSender<RunQueryArgs>
  , pub self_test_tx
      : tokio::sync::mpsc::UnboundedSender<SelfTestArgs>
  , pub update_settings_tx
      : tokio::sync::mpsc::UnboundedSender<UpdateSettingsArgs>
  , pub get_state_tx
      : tokio::sync::mpsc::UnboundedSender<GetStateArgs>
  , pub clear_tx
      : tokio::sync::mpsc::UnboundedSender<ClearArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== AltFoot (receiver side) =====

pub struct AltFoot
{   pub run_query_rx
      : tokio::sync::mpsc::UnboundedReceiver<RunQueryArgs>
  , pub self_test_rx
      : tokio::sync::mpsc::UnboundedReceiver<SelfTestArgs>
  , pub update_settings_rx
      : tokio::sync::mpsc::UnboundedReceiver<UpdateSettingsArgs>
  , pub get_state_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetStateArgs>
  , pub clear_rx
      : tokio::sync::mpsc::UnboundedReceiver<ClearArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// ALTPHRASE STRUCTURES:

/// The four supported provider protocol families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Provider
{
  /// OpenAI Responses API (structured JSON-schema output)
  #[serde(rename = "openai")]
  OpenAI
  ,
  /// Any OpenAI-compatible endpoint, chat or legacy completion
  Compatible
  ,
  /// Anthropic Messages API
  Anthropic
  ,
  /// Google Gemini generateContent
  #[serde(alias = "gemini")]
  Google
}

impl Provider
{   /// Human readable name used in error messages
    pub fn display_name(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "OpenAI"
          , Provider::Compatible => "Compatible API"
          , Provider::Anthropic => "Anthropic"
          , Provider::Google => "Gemini"
        }
    }

    /// Parse a provider id as written in settings or env
    pub fn from_id(id: &str) -> Option<Provider>
    {   match id.trim().to_ascii_lowercase().as_str()
        {   "openai" => Some(Provider::OpenAI)
          , "compatible" => Some(Provider::Compatible)
          , "anthropic" => Some(Provider::Anthropic)
          , "google" | "gemini" => Some(Provider::Google)
          , _ => None
        }
    }
}

impl fmt::Display for Provider
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   write!(f, "{}", self.display_name())
    }
}

/// Whether the input is a single word or a whole sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Mode
{   Word
  , Sentence
}

/// Register for sentence rewrites; ignored in word mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Tone
{   Casual
  , Formal
}

/// One proposed alternative plus an optional short usage note.
/// Order in a result list is the model's ranking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Candidate
{   pub word: String
  , pub note: String
}

impl Candidate
{   pub fn new(word: impl Into<String>, note: impl Into<String>) -> Self
    {   Candidate
        {   word: word.into()
          , note: note.into()
        }
    }
}

/// Everything a front end needs to draw: the current list,
/// the loading flag, the last error and the self-test line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState
{   pub candidates: Vec<Candidate>
  , pub loading: bool
  , pub error: Option<String>
  , pub self_test_status: Option<String>
}
