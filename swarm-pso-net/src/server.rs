//! Newline-delimited-JSON TCP front end
//!
//! Each accepted connection is served by its own task. A connection carries
//! any number of request lines; every line gets exactly one reply line. A
//! malformed line earns an error reply but never tears the connection down,
//! since the legacy workers reconnect poorly.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use swarm_pso_core::swarm::WorkReply;

use crate::protocol::{ClientRequest, CoordinatorReply, ResultSubmission, WorkPayload};
use crate::Result;

/// The engine-side surface the transport drives.
///
/// Implementations serialize access to the swarm themselves; the server
/// happily calls this from many connection tasks at once.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Hand out the next evaluation assignment, or report completion.
    async fn request_work(&self) -> Result<WorkReply>;

    /// Accept one evaluated fitness value.
    async fn submit_result(&self, submission: ResultSubmission) -> Result<()>;
}

/// Accept connections forever, spawning a handler task per worker.
pub async fn serve(listener: TcpListener, coordinator: Arc<dyn Coordinator>) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "coordinator listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "worker connected");
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            if let Err(error) = handle_connection(stream, coordinator).await {
                warn!(%peer, %error, "connection closed with error");
            }
        });
    }
}

/// Serve one connection until the peer hangs up.
pub async fn handle_connection<S>(stream: S, coordinator: Arc<dyn Coordinator>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = dispatch_line(&line, coordinator.as_ref()).await;
        let mut encoded = serde_json::to_vec(&reply.to_json()?)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
    }
    Ok(())
}

async fn dispatch_line(line: &str, coordinator: &dyn Coordinator) -> CoordinatorReply {
    let request: ClientRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(error) => {
            debug!(%error, "unparseable request line");
            return CoordinatorReply::Error(error.to_string());
        }
    };
    match request {
        ClientRequest::RequestWork => match coordinator.request_work().await {
            Ok(WorkReply::Assignment(item)) => CoordinatorReply::Work(WorkPayload::from(&item)),
            Ok(WorkReply::Completed) => CoordinatorReply::Completed,
            Err(error) => CoordinatorReply::Error(error.to_string()),
        },
        ClientRequest::SubmitResult(submission) => {
            match coordinator.submit_result(submission).await {
                Ok(()) => CoordinatorReply::Ack,
                Err(error) => CoordinatorReply::Error(error.to_string()),
            }
        }
    }
}
