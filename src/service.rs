use std::sync::Arc;
use tokio::sync::mpsc;
use log::{debug, error, info};
use crate::ServiceFoot;
use crate::processor::RequestProcessor;

/// Public API for the processor service - owns the task
pub struct ServiceBackend
{   hand: crate::ServiceHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl ServiceBackend
{   /// Create and spawn a new processor service
    /// Returns immediately - spawns background task
    pub fn new(processor: Arc<RequestProcessor>) -> Self
    {   debug!("Creating ServiceBackend with task ownership");

        let (process_tx, process_rx)
          = mpsc::unbounded_channel();
        let (health_tx, health_rx)
          = mpsc::unbounded_channel();
        let (get_model_list_tx, get_model_list_rx)
          = mpsc::unbounded_channel();
        let (get_platform_list_tx, get_platform_list_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::ServiceHand
        {   process_tx
          , health_tx
          , get_model_list_tx
          , get_platform_list_tx
          , kill_process_tx
        };

        let foot = crate::ServiceFoot
        {   process_rx
          , health_rx
          , get_model_list_rx
          , get_platform_list_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_service_loop(foot, processor).await
        });

        ServiceBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a request - returns almost immediately
    pub fn process(
      &self
    , request: crate::LlmRequest
    ) -> Result<
        mpsc::UnboundedReceiver<crate::ProcessReply>,
        crate::error::Error
      >
    {   debug!("process queuing request for {}/{}",
          request.platform, request.model);
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::ProcessArgs
        {   request
          , reply: reply_tx
        };

        self.hand.process_tx
          .send(cmd)
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Queue and wait for the result
    pub async fn process_and_wait(
      &self
    , request: crate::LlmRequest
    ) -> crate::ProcessReply
    {   let mut rx = self.process(request)?;
        recv_reply(&mut rx).await
    }

    pub async fn health(&self) -> crate::HealthReply
    {   debug!("health queuing command");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        self.hand.health_tx
          .send(crate::HealthArgs { reply: reply_tx })
          .map_err(|_| disconnected())?;

        recv_reply(&mut reply_rx).await
    }

    pub async fn get_model_list(&self) -> crate::GetModelListReply
    {   debug!("get_model_list queuing command");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        self.hand.get_model_list_tx
          .send(crate::GetModelListArgs { reply: reply_tx })
          .map_err(|_| disconnected())?;

        recv_reply(&mut reply_rx).await
    }

    pub async fn get_platform_list(&self)
      -> crate::GetPlatformListReply
    {   debug!("get_platform_list queuing command");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        self.hand.get_platform_list_tx
          .send(crate::GetPlatformListArgs { reply: reply_tx })
          .map_err(|_| disconnected())?;

        recv_reply(&mut reply_rx).await
    }

    /// Gracefully shutdown the service
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down ServiceBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Service channel already closed");
            crate::error::Error::Other(
              "Service already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Service shutdown confirmed");
            result
        } else
        {   error!("Service shutdown lost");
            Err(crate::error::Error::Other(
              "Service stopped without confirming shutdown".to_string()
            ))
        }
    }
}

fn disconnected() -> crate::error::Error
{   error!("Service channel closed");
    crate::error::Error::Other("Service disconnected".to_string())
}

async fn recv_reply<T>(
  rx: &mut mpsc::UnboundedReceiver<Result<T, crate::error::Error>>
) -> Result<T, crate::error::Error>
{   match rx.recv().await
    {   Some(reply) => reply
      , None => Err(disconnected())
    }
}

/// Main service event loop
///
/// tokio::select! is only for routing. Each process command runs
/// on its own task so requests never wait on one another.
async fn run_service_loop(
  foot: crate::ServiceFoot
, processor: Arc<RequestProcessor>
)
{   debug!("Starting ServiceBackend event loop");
    let ServiceFoot
    {   mut process_rx
      , mut health_rx
      , mut get_model_list_rx
      , mut get_platform_list_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = process_rx.recv() => {
          let processor = processor.clone();
          tokio::spawn(async move {
            let crate::ProcessArgs { request, reply } = cmd;
            let worker = tokio::task::spawn_blocking(move || {
              processor.process(&request)
            });
            // A panic inside the pipeline is a defect; report it as one
            let result = worker.await.map_err(|e| {
              error!("Processing task failed: {}", e);
              crate::error::Error::Internal(e.to_string())
            });
            let _ = reply.send(result);
          });
        }
      , Some(cmd) = health_rx.recv() => {
          debug!("Received Health");
          let _ = cmd.reply.send(Ok(processor.health()));
        }
      , Some(cmd) = get_model_list_rx.recv() => {
          debug!("Received GetModelList");
          let _ = cmd.reply.send(Ok(processor.supported_models()));
        }
      , Some(cmd) = get_platform_list_rx.recv() => {
          debug!("Received GetPlatformList");
          let _ = cmd.reply.send(Ok(processor.supported_platforms()));
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("ServiceBackend shutting down");
          break;
        }
      , else => {
          debug!("All service channels closed");
          break;
        }
      }
    }
}
