//! Single-owner actor around the swarm engine
//!
//! The engine is synchronous and single-threaded by design; every request
//! and submission mutates shared generation state. One task owns the
//! [`Swarm`] and drains a command channel, so connection handlers never
//! contend on a lock and every operation observes a fully settled swarm.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use swarm_pso_core::config::SwarmSettings;
use swarm_pso_core::domain::DomainSpec;
use swarm_pso_core::record::GenerationSink;
use swarm_pso_core::swarm::{Swarm, SwarmStatus, WorkReply};
use swarm_pso_net::protocol::ResultSubmission;
use swarm_pso_net::server::Coordinator;

/// Point-in-time view of the session for status reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub generation: u32,
    pub status: SwarmStatus,
    pub global_best: Vec<f64>,
    pub global_best_fitness: f64,
}

enum Command {
    RequestWork(oneshot::Sender<swarm_pso_core::Result<WorkReply>>),
    SubmitResult(
        ResultSubmission,
        oneshot::Sender<swarm_pso_core::Result<()>>,
    ),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Cloneable handle to the swarm-owning task.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Build the swarm and spawn the owning task. Construction is eager so
    /// an invalid configuration fails here, not on the first request.
    pub fn spawn(
        settings: SwarmSettings,
        domain: DomainSpec,
        sink: Box<dyn GenerationSink>,
    ) -> swarm_pso_core::Result<Self> {
        let swarm = Swarm::new(settings, domain, sink)?;
        Ok(Self::with_swarm(swarm))
    }

    /// Spawn the owning task around an already-built swarm.
    pub fn with_swarm(swarm: Swarm) -> Self {
        let (commands, receiver) = mpsc::channel(64);
        tokio::spawn(run_actor(swarm, receiver));
        Self { commands }
    }

    /// Observe the session without mutating it.
    pub async fn snapshot(&self) -> swarm_pso_net::Result<SessionSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        response.await.map_err(|_| actor_gone())
    }

    async fn send(&self, command: Command) -> swarm_pso_net::Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| actor_gone())
    }
}

#[async_trait]
impl Coordinator for CoordinatorHandle {
    async fn request_work(&self) -> swarm_pso_net::Result<WorkReply> {
        let (reply, response) = oneshot::channel();
        self.send(Command::RequestWork(reply)).await?;
        Ok(response.await.map_err(|_| actor_gone())??)
    }

    async fn submit_result(&self, submission: ResultSubmission) -> swarm_pso_net::Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::SubmitResult(submission, reply)).await?;
        Ok(response.await.map_err(|_| actor_gone())??)
    }
}

fn actor_gone() -> swarm_pso_net::Error {
    swarm_pso_net::Error::Shutdown
}

async fn run_actor(mut swarm: Swarm, mut receiver: mpsc::Receiver<Command>) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::RequestWork(reply) => {
                let _ = reply.send(swarm.request_work());
            }
            Command::SubmitResult(submission, reply) => {
                let outcome = swarm.submit_result(
                    submission.particle_id,
                    submission.generation,
                    submission.run_id,
                    submission.answer,
                );
                let _ = reply.send(outcome);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(SessionSnapshot {
                    generation: swarm.generation(),
                    status: swarm.status(),
                    global_best: swarm.global_best().to_vec(),
                    global_best_fitness: swarm.global_best_fitness(),
                });
            }
        }
    }
    debug!("all coordinator handles dropped, swarm task exiting");
}
