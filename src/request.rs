//! Unified request and response types for altphrase

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider-agnostic description of one query,
/// built fresh for every call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec
{   /// Instruction text, identical for all providers
    pub system_prompt: String
  , /// The user's turn
    pub user_prompt: String
  , /// Output size ceiling, scaled by requested count
    pub max_output_size: u32
  , /// Sampling temperature
    pub temperature: f64
}

/// Fully formed HTTP request produced by an encoder
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest
{   /// Always POST for the supported providers
    pub method: String
  , pub url: String
  , /// Header name/value pairs in insertion order
    pub headers: Vec<(String, String)>
  , /// JSON body
    pub body: serde_json::Value
  , /// Per-call timeout
    pub timeout: Duration
}

impl HttpRequest
{   /// JSON POST with the content type already set
    pub fn post_json(
      url: impl Into<String>
    , body: serde_json::Value
    , timeout: Duration
    ) -> Self
    {   HttpRequest
        {   method: "POST".to_string()
          , url: url.into()
          , headers: vec![(
              "Content-Type".to_string()
            , "application/json".to_string()
            )]
          , body
          , timeout
        }
    }

    pub fn with_header(
      mut self
    , name: impl Into<String>
    , value: impl Into<String>
    ) -> Self
    {   self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value with this name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str>
    {   self.headers
          .iter()
          .find(|(k, _)| k.eq_ignore_ascii_case(name))
          .map(|(_, v)| v.as_str())
    }
}

/// Raw status and body handed back by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse
{   pub status: u16
  , pub body: String
}

impl HttpResponse
{   pub fn new(status: u16, body: impl Into<String>) -> Self
    {   HttpResponse
        {   status
          , body: body.into()
        }
    }
}
