//! Job hub
//!
//! Process-wide registry of connected agents. A single coordinating task owns
//! the agent table and handles every register, unregister, direct send and
//! broadcast in the order the commands arrive, so a broadcast never sees the
//! table half-updated.
//!
//! Delivery never waits on an agent: each agent has a bounded outbound queue,
//! and an agent whose queue is full (or whose writer has gone away) is
//! dropped on the spot. Dropping the agent's sender closes its queue, which
//! lets its writer finish.

use charex_common::config::HubConfig;
use charex_common::messages::OutgoingMessage;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Agent identifier, unique per connection
pub type AgentId = Uuid;

/// Serialized message text shared between recipients of one broadcast
pub type Outbound = Arc<str>;

/// Hub error
#[derive(Debug, Error)]
pub enum HubError {
    /// The coordinating task has stopped
    #[error("hub is not running")]
    Closed,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

enum HubCommand {
    Register {
        id: AgentId,
        tx: mpsc::Sender<Outbound>,
    },
    Unregister(AgentId),
    SendTo {
        id: AgentId,
        msg: Outbound,
    },
    Broadcast(Outbound),
    AgentCount(oneshot::Sender<usize>),
}

/// A registered agent's end of its outbound queue
#[derive(Debug)]
pub struct Registration {
    pub id: AgentId,
    pub outbound: mpsc::Receiver<Outbound>,
}

/// Cloneable handle to the hub task
///
/// The task runs until every handle has been dropped.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::Sender<HubCommand>,
    outbound_capacity: usize,
}

impl Hub {
    /// Spawn the coordinating task with configured queue sizes
    pub fn spawn(config: &HubConfig) -> Self {
        Self::with_capacity(config.outbound_capacity, config.command_capacity)
    }

    /// Spawn the coordinating task
    ///
    /// `outbound_capacity` is the per-agent queue size; `command_capacity`
    /// bounds the hub's own command queue.
    pub fn with_capacity(outbound_capacity: usize, command_capacity: usize) -> Self {
        let (commands, rx) = mpsc::channel(command_capacity.max(1));
        tokio::spawn(run(rx));
        info!(outbound_capacity, command_capacity, "Job hub started");
        Self {
            commands,
            outbound_capacity: outbound_capacity.max(1),
        }
    }

    /// Register a new agent and hand back its outbound queue
    pub async fn register(&self) -> Result<Registration, HubError> {
        let id = Uuid::new_v4();
        let (tx, outbound) = mpsc::channel(self.outbound_capacity);
        self.command(HubCommand::Register { id, tx }).await?;
        Ok(Registration { id, outbound })
    }

    /// Remove an agent and close its queue; a no-op if already gone
    pub async fn unregister(&self, id: AgentId) -> Result<(), HubError> {
        self.command(HubCommand::Unregister(id)).await
    }

    /// Deliver a message to one agent
    ///
    /// Silently dropped if the agent is no longer registered.
    pub async fn send_to(&self, id: AgentId, message: &OutgoingMessage) -> Result<(), HubError> {
        let msg = encode(message)?;
        self.command(HubCommand::SendTo { id, msg }).await
    }

    /// Deliver a message to every agent registered when the hub handles it
    pub async fn broadcast(&self, message: &OutgoingMessage) -> Result<(), HubError> {
        let msg = encode(message)?;
        self.command(HubCommand::Broadcast(msg)).await
    }

    /// Number of registered agents
    ///
    /// Answered in command order, so it reflects every command sent before it.
    pub async fn agent_count(&self) -> Result<usize, HubError> {
        let (reply, rx) = oneshot::channel();
        self.command(HubCommand::AgentCount(reply)).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    async fn command(&self, cmd: HubCommand) -> Result<(), HubError> {
        self.commands.send(cmd).await.map_err(|_| HubError::Closed)
    }
}

fn encode(message: &OutgoingMessage) -> Result<Outbound, HubError> {
    Ok(Arc::from(message.to_json()?))
}

async fn run(mut commands: mpsc::Receiver<HubCommand>) {
    let mut agents: HashMap<AgentId, mpsc::Sender<Outbound>> = HashMap::new();

    while let Some(cmd) = commands.recv().await {
        match cmd {
            HubCommand::Register { id, tx } => {
                agents.insert(id, tx);
                debug!(agent_id = %id, agents = agents.len(), "Agent registered");
            }
            HubCommand::Unregister(id) => {
                if agents.remove(&id).is_some() {
                    debug!(agent_id = %id, agents = agents.len(), "Agent unregistered");
                }
            }
            HubCommand::SendTo { id, msg } => {
                let delivered = match agents.get(&id) {
                    Some(tx) => deliver(id, tx, msg),
                    None => true,
                };
                if !delivered {
                    agents.remove(&id);
                }
            }
            HubCommand::Broadcast(msg) => {
                agents.retain(|id, tx| deliver(*id, tx, Arc::clone(&msg)));
                debug!(agents = agents.len(), "Broadcast delivered");
            }
            HubCommand::AgentCount(reply) => {
                let _ = reply.send(agents.len());
            }
        }
    }

    debug!("Job hub stopped");
}

/// Try to queue `msg`; false means the agent must be dropped
fn deliver(id: AgentId, tx: &mpsc::Sender<Outbound>, msg: Outbound) -> bool {
    match tx.try_send(msg) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(agent_id = %id, "Outbound queue full, dropping agent");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(agent_id = %id, "Agent writer gone, dropping agent");
            false
        }
    }
}
