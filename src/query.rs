//! Query pipeline: prompt -> encode -> send -> decode -> extract
//!
//! The transport call is the only await point; everything before
//! and after it is plain synchronous work on owned values.

use log::{debug, error, info};

use crate::config::Settings;
use crate::error::Error;
use crate::extract::extract_candidates;
use crate::prompt::build_request_spec;
use crate::providers::codec_for;
use crate::transport::Transport;
use crate::{Candidate, Mode, Tone};

/// Word sent by the self-test
pub const PROBE_WORD: &str = "高兴";
const PROBE_COUNT: usize = 3;

fn empty_input_message(mode: Mode) -> &'static str
{   match mode
    {   Mode::Word => "Please enter a word"
      , Mode::Sentence => "Please enter a sentence"
    }
}

/// Run one query against the active provider and return at most
/// `count` candidates in model order
pub async fn run_query<T>(
  settings: &Settings
, transport: &T
, text: &str
, mode: Mode
, tone: Tone
, count: usize
) -> Result<Vec<Candidate>, Error>
where T: Transport + ?Sized
{   let text = text.trim();
    if text.is_empty()
    {   debug!("Rejecting blank {:?} input", mode);
        return Err(Error::EmptyInput(empty_input_message(mode).to_string()));
    }

    let spec = build_request_spec(
      text, mode, tone, count, settings.temperature
    );
    let codec = codec_for(settings);
    let request = codec.encode(
      &spec
    , settings.active_config()
    , settings.timeout()
    )?;

    debug!("Sending {:?} query to {}", mode, codec.name());
    let response = transport.send(request).await?;
    debug!("{} answered HTTP {}", codec.name(), response.status);

    let answer = codec.decode(response.status, &response.body)?;
    let mut candidates = extract_candidates(&answer)?;
    candidates.truncate(count);

    if candidates.is_empty()
    {   error!("{} returned no usable results", codec.name());
        return Err(Error::EmptyResult);
    }
    info!("{} returned {} candidates", codec.name(), candidates.len());
    Ok(candidates)
}

/// `run_query` with the count configured for `mode`
pub async fn run_configured_query<T>(
  settings: &Settings
, transport: &T
, text: &str
, mode: Mode
, tone: Tone
) -> Result<Vec<Candidate>, Error>
where T: Transport + ?Sized
{   run_query(
      settings, transport, text, mode, tone, settings.count_for(mode)
    ).await
}

/// Same pipeline with a fixed probe word; reports how many
/// candidates came back
pub async fn self_test<T>(
  settings: &Settings
, transport: &T
) -> Result<usize, Error>
where T: Transport + ?Sized
{   info!("Self-test against {}", settings.provider);
    run_query(
      settings, transport, PROBE_WORD, Mode::Word, Tone::Casual, PROBE_COUNT
    )
    .await
    .map(|candidates| candidates.len())
}

/// Single status line for a self-test outcome
pub fn self_test_status(result: &Result<usize, Error>) -> String
{   match result
    {   Ok(n) => format!("Connection OK: received {} candidates", n)
      , Err(e) => format!("Self-test failed: {}", e)
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::request::{HttpRequest, HttpResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed body and remembers what it was sent
    struct CannedTransport
    {   status: u16
      , body: String
      , sent: Mutex<Vec<HttpRequest>>
    }

    impl CannedTransport
    {   fn new(status: u16, body: &str) -> Self
        {   CannedTransport
            {   status
              , body: body.to_string()
              , sent: Mutex::new(vec![])
            }
        }

        fn calls(&self) -> usize
        {   self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for CannedTransport
    {   async fn send(&self, request: HttpRequest)
          -> Result<HttpResponse, Error>
        {   self.sent.lock().unwrap().push(request);
            Ok(HttpResponse::new(self.status, self.body.clone()))
        }
    }

    fn settings() -> Settings
    {   let mut settings = Settings::default();
        settings.openai.api_key = "sk-test".to_string();
        settings
    }

    fn openai_body(answer: &str) -> String
    {   serde_json::json!({
          "output": [{
            "type": "message",
            "content": [{ "type": "output_text", "text": answer }]
          }]
        }).to_string()
    }

    #[test]
    fn blank_input_is_rejected_with_mode_wording()
    {   let transport = CannedTransport::new(200, "{}");
        let err = tokio_test::block_on(run_query(
          &settings(), &transport, "   ", Mode::Sentence, Tone::Formal, 3
        )).unwrap_err();
        assert_eq!(err, Error::EmptyInput("Please enter a sentence".to_string()));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn results_are_truncated_in_order()
    {   let words: Vec<_> = (1..=8)
          .map(|i| serde_json::json!({"word": format!("w{}", i), "note": ""}))
          .collect();
        let answer = serde_json::json!({ "candidates": words }).to_string();
        let transport = CannedTransport::new(200, &openai_body(&answer));

        let result = tokio_test::block_on(run_query(
          &settings(), &transport, "高兴", Mode::Word, Tone::Casual, 5
        )).unwrap();
        let got: Vec<_> = result.iter().map(|c| c.word.as_str()).collect();
        assert_eq!(got, ["w1", "w2", "w3", "w4", "w5"]);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn empty_candidate_list_is_empty_result()
    {   let transport = CannedTransport::new(
          200, &openai_body(r#"{"candidates":[]}"#)
        );
        let err = tokio_test::block_on(run_query(
          &settings(), &transport, "高兴", Mode::Word, Tone::Casual, 5
        )).unwrap_err();
        assert_eq!(err, Error::EmptyResult);
    }

    #[test]
    fn self_test_reports_count()
    {   let answer = r#"{"candidates":[{"word":"开心","note":""},{"word":"愉快","note":""}]}"#;
        let transport = CannedTransport::new(200, &openai_body(answer));
        let result = tokio_test::block_on(self_test(&settings(), &transport));
        assert_eq!(result, Ok(2));
        assert_eq!(
          self_test_status(&result)
        , "Connection OK: received 2 candidates"
        );
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].body["input"], format!("词语：{}", PROBE_WORD));
    }

    #[test]
    fn self_test_failure_status_line()
    {   let status = self_test_status(&Err(Error::Timeout));
        assert_eq!(status, "Self-test failed: Request timed out");
    }
}
