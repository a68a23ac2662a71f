use tokio::sync::mpsc;
use log::{debug, error, info};

use crate::config::EssayConfig;
use crate::pipeline::EssayPipeline;
use crate::request::EssayRequest;
use crate::EssayFoot;

/// Public API for essay generation - owns the task
pub struct EssayBackend
{   hand: crate::EssayHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl EssayBackend
{   /// Create and spawn a new essay backend
    /// Returns immediately - spawns background task
    pub fn new(pipeline: EssayPipeline) -> Self
    {   debug!("Creating EssayBackend with task ownership");

        let (generate_essay_tx, generate_essay_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::EssayHand
        {   generate_essay_tx
          , kill_process_tx
        };

        let foot = crate::EssayFoot
        {   generate_essay_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, pipeline).await
        });

        EssayBackend
        {   hand
          , _task_handle
        }
    }

    /// Build the provider clients from configuration and spawn
    pub fn from_config(config: &EssayConfig)
      -> Result<Self, crate::error::Error>
    {   Ok(EssayBackend::new(EssayPipeline::from_config(config)?))
    }

    /// Queue an essay job - returns almost immediately
    pub async fn generate_essay(
      &self
    , request: EssayRequest
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateEssayReply>,
        crate::error::Error
      >
    {   debug!("generate_essay queuing topic: {:?}", request.topic);
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateEssayArgs
        {   request
          , reply: reply_tx
        };

        self.hand.generate_essay_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend.
    /// Jobs already running finish and still reply.
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down EssayBackend");
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
        {   error!("Backend exited without confirming shutdown");
            Err(crate::error::Error::Other(
              "Backend exited without confirming shutdown".to_string()
            ))
        }
    }
}

/// Main backend event loop
///
/// tokio::select! only routes commands. Every essay job runs on its own
/// task, so jobs never wait on each other.
async fn run_backend_loop(
  foot: crate::EssayFoot
, pipeline: EssayPipeline
)
{   debug!("Starting EssayBackend event loop");
    let EssayFoot
    {   mut generate_essay_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = generate_essay_rx.recv() => {
          debug!("Received GenerateEssay");
          let pipeline = pipeline.clone();
          tokio::spawn(async move {
            let result = pipeline.run(&cmd.request).await;
            if let Err(e) = &result
            {   error!("Essay job failed: {}", e);
            }
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("EssayBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
