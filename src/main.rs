use clap::Parser;
use log::{debug, error};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use altphrase::{AltBackend, Mode, ReqwestTransport, Settings, Tone};

/// Ask an LLM for alternative Chinese words or sentence rewrites
#[derive(Debug, Parser)]
#[command(name = "altphrase", version)]
struct CliArgs
{   /// JSON settings file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>
  , /// openai, compatible, anthropic or google
    #[arg(long, value_name = "ID")]
    provider: Option<String>
  , /// Rewrite a whole sentence instead of a word
    #[arg(long)]
    sentence: bool
  , /// Formal register for sentence rewrites
    #[arg(long)]
    formal: bool
  , /// Number of alternatives; defaults to the configured count
    #[arg(long, value_name = "N")]
    count: Option<usize>
  , /// Check the connection with a fixed probe word
    #[arg(long)]
    self_test: bool
  , text: Vec<String>
}

impl CliArgs
{   fn mode(&self) -> Mode
    {   if self.sentence { Mode::Sentence } else { Mode::Word }
    }

    fn tone(&self) -> Tone
    {   if self.formal { Tone::Formal } else { Tone::Casual }
    }

    fn text(&self) -> String
    {   self.text.join(" ")
    }
}

fn load_settings(cli: &CliArgs) -> Result<Settings, altphrase::Error>
{   let mut settings = match &cli.config
    {   Some(path) => Settings::load(path)?
      , None => Settings::default()
    };
    settings.apply_env();
    if let Some(id) = &cli.provider
    {   settings.provider = altphrase::Provider::from_id(id)
          .ok_or_else(|| altphrase::Error::InvalidSettings(
            format!("unknown provider: {}", id)
          ))?;
    }
    settings.validate()?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> ExitCode
{   env_logger::init();

    let cli = CliArgs::parse();
    let settings = match load_settings(&cli)
    {   Ok(s) => s
      , Err(e) => {
          error!("{}", e);
          eprintln!("{}", e);
          return ExitCode::from(2);
        }
    };
    debug!("Using provider {}", settings.provider);

    let transport = match ReqwestTransport::with_user_agent()
    {   Ok(t) => t
      , Err(e) => {
          error!("{}", e);
          eprintln!("{}", e);
          return ExitCode::FAILURE;
        }
    };
    let backend = AltBackend::with_transport(settings, Arc::new(transport));
    let code = if cli.self_test
    {   run_self_test(&backend).await
    } else
    {   run_query(&backend, &cli).await
    };
    let _ = backend.shutdown().await;
    code
}

async fn run_self_test(backend: &AltBackend) -> ExitCode
{   let mut rx = match backend.self_test().await
    {   Ok(rx) => rx
      , Err(e) => {
          eprintln!("{}", e);
          return ExitCode::FAILURE;
        }
    };
    let ok = matches!(rx.recv().await, Some(Ok(_)));
    if let Ok(state) = backend.get_state().await
    {   if let Some(status) = state.self_test_status
        {   println!("{}", status);
        }
    }
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

async fn run_query(backend: &AltBackend, cli: &CliArgs) -> ExitCode
{   let mut rx = match backend
      .run_query(cli.text(), cli.mode(), cli.tone(), cli.count)
      .await
    {   Ok(rx) => rx
      , Err(e) => {
          eprintln!("{}", e);
          return ExitCode::FAILURE;
        }
    };
    match rx.recv().await
    {   Some(Ok(candidates)) => {
          for (i, c) in candidates.iter().enumerate()
          {   if c.note.is_empty()
              {   println!("{}. {}", i + 1, c.word);
              } else
              {   println!("{}. {} — {}", i + 1, c.word, c.note);
              }
          }
          ExitCode::SUCCESS
        }
      , Some(Err(e)) => {
          eprintln!("{}", e);
          ExitCode::FAILURE
        }
      , None => {
          eprintln!("backend stopped before answering");
          ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn parses_sentence_query()
    {   let cli = CliArgs::try_parse_from([
          "altphrase", "--sentence", "--formal", "--count", "4", "我们", "明天见"
        ]).unwrap();
        assert_eq!(cli.mode(), Mode::Sentence);
        assert_eq!(cli.tone(), Tone::Formal);
        assert_eq!(cli.count, Some(4));
        assert_eq!(cli.text(), "我们 明天见");
        assert!(!cli.self_test);
    }

    #[test]
    fn parses_self_test_with_config()
    {   let cli = CliArgs::try_parse_from([
          "altphrase", "--config", "alt.json", "--provider", "gemini", "--self-test"
        ]).unwrap();
        assert!(cli.self_test);
        assert_eq!(cli.config, Some(PathBuf::from("alt.json")));
        assert_eq!(cli.provider.as_deref(), Some("gemini"));
        assert_eq!(cli.mode(), Mode::Word);
        assert_eq!(cli.tone(), Tone::Casual);
    }

    #[test]
    fn rejects_bad_count()
    {   assert!(CliArgs::try_parse_from(["altphrase", "--count", "many", "好"]).is_err());
    }
}
