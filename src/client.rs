use std::sync::Arc;
use tokio::sync::mpsc;
use log::{debug, error, info, warn};

use crate::config::Settings;
use crate::query::{run_query, self_test, self_test_status};
use crate::transport::{ReqwestTransport, Transport};
use crate::{AltFoot, Candidate, ViewState};

/// Results of spawned network work, routed back into the loop
enum Completion
{   Query
    {   generation: u64
      , result: crate::RunQueryReply
      , reply: crate::RunQueryReplySender
    }
  , SelfTest
    {   generation: u64
      , result: crate::SelfTestReply
      , reply: crate::SelfTestReplySender
    }
}

/// Backend state; only the loop task touches it
pub struct AltBackendState
{   pub settings: Settings
  , pub view: ViewState
  , pub transport: Arc<dyn Transport>
  , /// Bumped per query; only the newest completion updates `view`
    pub query_generation: u64
  , pub self_test_generation: u64
}

impl AltBackendState
{   pub fn new(
      settings: Settings
    , transport: Arc<dyn Transport>
    ) -> Self
    {   debug!("Initializing AltBackendState");
        AltBackendState
        {   settings
          , view: ViewState::default()
          , transport
          , query_generation: 0
          , self_test_generation: 0
        }
    }

    /// New query: old results go away, loading turns on
    fn begin_query(&mut self) -> u64
    {   self.query_generation += 1;
        self.view.candidates.clear();
        self.view.error = None;
        self.view.loading = true;
        self.query_generation
    }

    fn finish_query(
      &mut self
    , generation: u64
    , result: &Result<Vec<Candidate>, crate::error::Error>
    )
    {   if generation != self.query_generation
        {   debug!(
              "Dropping stale query result {} (current {})",
              generation, self.query_generation
            );
            return;
        }
        self.view.loading = false;
        match result
        {   Ok(candidates) => {
              self.view.candidates = candidates.clone();
              self.view.error = None;
            }
          , Err(e) => {
              self.view.candidates.clear();
              self.view.error = Some(e.to_string());
            }
        }
    }

    fn begin_self_test(&mut self) -> u64
    {   self.self_test_generation += 1;
        self.view.self_test_status = Some("Testing connection…".to_string());
        self.self_test_generation
    }

    fn finish_self_test(
      &mut self
    , generation: u64
    , result: &crate::SelfTestReply
    )
    {   if generation != self.self_test_generation
        {   debug!("Dropping stale self-test result {}", generation);
            return;
        }
        self.view.self_test_status = Some(self_test_status(result));
    }

    fn clear(&mut self)
    {   self.view.candidates.clear();
        self.view.error = None;
    }
}

/// Public API for the altphrase backend - owns the task
pub struct AltBackend
{   hand: crate::AltHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl AltBackend
{   /// Create and spawn a backend talking HTTP through reqwest.
    /// Returns immediately - spawns background task
    pub fn new(settings: Settings) -> Self
    {   AltBackend::with_transport(
          settings
        , Arc::new(ReqwestTransport::new())
        )
    }

    /// Create and spawn a backend over any transport
    pub fn with_transport(
      settings: Settings
    , transport: Arc<dyn Transport>
    ) -> Self
    {   debug!("Creating AltBackend with task ownership");

        let (run_query_tx, run_query_rx)
          = mpsc::unbounded_channel();
        let (self_test_tx, self_test_rx)
          = mpsc::unbounded_channel();
        let (update_settings_tx, update_settings_rx)
          = mpsc::unbounded_channel();
        let (get_state_tx, get_state_rx)
          = mpsc::unbounded_channel();
        let (clear_tx, clear_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::AltHand
        {   run_query_tx
          , self_test_tx
          , update_settings_tx
          , get_state_tx
          , clear_tx
          , kill_process_tx
        };

        let foot = crate::AltFoot
        {   run_query_rx
          , self_test_rx
          , update_settings_rx
          , get_state_rx
          , clear_rx
          , kill_process_rx
        };

        let state = AltBackendState::new(settings, transport);
        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, state).await
        });

        AltBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a query - returns almost immediately.
    /// `count: None` uses the configured count for the mode.
    pub async fn run_query(
      &self
    , text: String
    , mode: crate::Mode
    , tone: crate::Tone
    , count: Option<usize>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::RunQueryReply>,
        crate::error::Error
      >
    {   debug!("run_query queuing {:?} query", mode);
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::RunQueryArgs
        {   text
          , mode
          , tone
          , count
          , reply: reply_tx
        };

        self.hand.run_query_tx
          .send(cmd)
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Queue a self-test - returns almost immediately
    pub async fn self_test(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::SelfTestReply>,
        crate::error::Error
      >
    {   debug!("self_test queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.hand.self_test_tx
          .send(crate::SelfTestArgs { reply: reply_tx })
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Replace settings; rejected settings leave the old ones active
    pub async fn update_settings(
      &self
    , settings: Settings
    ) -> Result<
        mpsc::UnboundedReceiver<crate::UpdateSettingsReply>,
        crate::error::Error
      >
    {   debug!("update_settings queuing for {}", settings.provider);
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::UpdateSettingsArgs
        {   settings
          , reply: reply_tx
        };

        self.hand.update_settings_tx
          .send(cmd)
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Snapshot of the view state
    pub async fn get_state(
      &self
    ) -> Result<ViewState, crate::error::Error>
    {   let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        self.hand.get_state_tx
          .send(crate::GetStateArgs { reply: reply_tx })
          .map_err(|_| disconnected())?;

        reply_rx.recv().await.ok_or_else(disconnected)
    }

    /// Drop current candidates and error
    pub async fn clear(&self) -> Result<(), crate::error::Error>
    {   let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        self.hand.clear_tx
          .send(crate::ClearArgs { reply: reply_tx })
          .map_err(|_| disconnected())?;

        reply_rx.recv().await.ok_or_else(disconnected)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down AltBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(crate::error::Error::Timeout)
        }
    }
}

fn disconnected() -> crate::error::Error
{   error!("Backend channel closed");
    crate::error::Error::Other(
      "Backend disconnected".to_string()
    )
}

/// Main backend event loop
///
/// select! arms only queue work: queries and self-tests are spawned
/// as their own tasks, and their results come back through the
/// completion channel so the view state is only ever mutated here.
async fn run_backend_loop(
  foot: AltFoot
, mut state: AltBackendState
)
{   debug!("Starting AltBackend event loop");
    let AltFoot
    {   mut run_query_rx
      , mut self_test_rx
      , mut update_settings_rx
      , mut get_state_rx
      , mut clear_rx
      , mut kill_process_rx
    } = foot;
    let (completion_tx, mut completion_rx)
      = mpsc::unbounded_channel::<Completion>();

    loop
    { tokio::select!
      { cmd = run_query_rx.recv() => {
          let Some(cmd) = cmd else {
            debug!("Hand dropped, stopping backend loop");
            break;
          };
          let generation = state.begin_query();
          debug!("Received RunQuery {} ({:?})", generation, cmd.mode);

          let settings = state.settings.clone();
          let transport = Arc::clone(&state.transport);
          let completion_tx = completion_tx.clone();
          tokio::spawn(async move {
            let count = cmd.count
              .unwrap_or_else(|| settings.count_for(cmd.mode));
            let result = run_query(
              &settings, &*transport, &cmd.text, cmd.mode, cmd.tone, count
            ).await;
            let _ = completion_tx.send(Completion::Query
            {   generation
              , result
              , reply: cmd.reply
            });
          });
        }
      , Some(cmd) = self_test_rx.recv() => {
          let generation = state.begin_self_test();
          debug!("Received SelfTest {}", generation);

          let settings = state.settings.clone();
          let transport = Arc::clone(&state.transport);
          let completion_tx = completion_tx.clone();
          tokio::spawn(async move {
            let result = self_test(&settings, &*transport).await;
            let _ = completion_tx.send(Completion::SelfTest
            {   generation
              , result
              , reply: cmd.reply
            });
          });
        }
      , Some(completion) = completion_rx.recv() => {
          match completion
          {   Completion::Query { generation, result, reply } => {
                state.finish_query(generation, &result);
                let _ = reply.send(result);
              }
            , Completion::SelfTest { generation, result, reply } => {
                state.finish_self_test(generation, &result);
                let _ = reply.send(result);
              }
          }
        }
      , Some(cmd) = update_settings_rx.recv() => {
          debug!("Received UpdateSettings");
          let result = cmd.settings.validate();
          match &result
          {   Ok(()) => {
                info!("Active provider: {}", cmd.settings.provider);
                state.settings = cmd.settings;
              }
            , Err(e) => warn!("Rejected settings: {}", e)
          }
          let _ = cmd.reply.send(result);
        }
      , Some(cmd) = get_state_rx.recv() => {
          let _ = cmd.reply.send(state.view.clone());
        }
      , Some(cmd) = clear_rx.recv() => {
          debug!("Received Clear");
          state.clear();
          let _ = cmd.reply.send(());
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("AltBackend shutting down");
          break;
        }
      }
    }
}
