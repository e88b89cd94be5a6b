use std::fmt;

/// Custom error type for altphrase operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Missing key, bad base URL or bad synthesized URL,
    /// detected before any network call
    Configuration(String)
  , /// Provider answered with an error object or HTTP >= 400
    Provider(String)
  , /// Provider answered successfully but with no usable text
    EmptyContent(String)
  , /// No candidate could be recovered from the model text
    Parse
  , /// Extraction succeeded but nothing survived truncation
    EmptyResult
  , /// Input text is blank
    EmptyInput(String)
  , /// Transport level failure
    Http(String)
  , /// Request timed out
    Timeout
  , /// Settings failed validation or could not be loaded
    InvalidSettings(String)
  , /// Generic error
    Other(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Configuration(msg) => {
              write!(f, "{}", msg)
            }
          , Error::Provider(msg) => {
              write!(f, "{}", msg)
            }
          , Error::EmptyContent(msg) => {
              write!(f, "{}", msg)
            }
          , Error::Parse => {
              write!(f, "Could not parse model response")
            }
          , Error::EmptyResult => {
              write!(f, "Model returned no usable results")
            }
          , Error::EmptyInput(msg) => {
              write!(f, "{}", msg)
            }
          , Error::Http(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::InvalidSettings(msg) => {
              write!(f, "Invalid settings: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn provider_messages_pass_through_verbatim()
    {   let err = Error::Provider("rate limited".to_string());
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn parse_error_is_provider_agnostic()
    {   assert_eq!(
          Error::Parse.to_string(),
          "Could not parse model response"
        );
    }
}
