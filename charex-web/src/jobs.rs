//! Job dispatcher
//!
//! Every inbound live-channel message becomes its own background job. Jobs
//! report only through the hub: status updates go to the originating agent,
//! and a finished card is broadcast to everyone. Nothing waits on a job.

use charex_common::messages::{ExtractPayload, InboundMessage, JobStatus, OutgoingMessage};
use charex_ex::{CardPersister, NormalizerRegistry, SourceNormalizer};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::hub::{AgentId, Hub};

/// Routes inbound messages to source normalizers
#[derive(Clone)]
pub struct JobDispatcher {
    hub: Hub,
    registry: NormalizerRegistry,
    persister: CardPersister,
}

impl JobDispatcher {
    pub fn new(hub: Hub, registry: NormalizerRegistry, persister: CardPersister) -> Self {
        Self {
            hub,
            registry,
            persister,
        }
    }

    /// Run `text` as a background job for `agent`
    pub fn spawn(&self, agent: AgentId, text: String) -> JoinHandle<()> {
        let dispatcher = self.clone();
        let span = info_span!("job", agent_id = %agent);
        tokio::spawn(async move { dispatcher.handle_message(agent, &text).await }.instrument(span))
    }

    /// Decode one inbound message and run the job it names
    ///
    /// Protocol errors are answered with an `error` status to `agent` only.
    pub async fn handle_message(&self, agent: AgentId, text: &str) {
        let message: InboundMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Unparseable message");
                self.send_status(agent, JobStatus::Error, "Invalid message format.")
                    .await;
                return;
            }
        };

        let Some(normalizer) = self.registry.by_job_type(&message.kind) else {
            warn!(message_type = %message.kind, "Unknown message type");
            self.send_status(
                agent,
                JobStatus::Error,
                format!("Unknown message type: {}", message.kind),
            )
            .await;
            return;
        };

        let payload: ExtractPayload = match serde_json::from_value(message.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(message_type = %message.kind, error = %e, "Invalid extraction payload");
                self.send_status(agent, JobStatus::Error, "Invalid payload for extraction.")
                    .await;
                return;
            }
        };

        self.run_extraction(agent, normalizer, payload).await;
    }

    async fn run_extraction(
        &self,
        agent: AgentId,
        normalizer: Arc<dyn SourceNormalizer>,
        payload: ExtractPayload,
    ) {
        let source = normalizer.label();
        let locator = payload.describe();
        info!(source, locator = %locator, "Handling extraction");

        self.send_status(
            agent,
            JobStatus::Started,
            format!("Starting extraction from {}...", locator),
        )
        .await;

        let extraction = match normalizer.extract(&payload.into_bytes()).await {
            Ok(extraction) => extraction,
            Err(e) => {
                error!(source, error = %e, "Extraction failed");
                self.send_status(agent, JobStatus::Error, format!("Extraction failed: {}", e))
                    .await;
                return;
            }
        };

        if let Err(e) = self
            .persister
            .persist(
                &extraction.card,
                &extraction.raw,
                extraction.avatar.as_deref(),
                source,
            )
            .await
        {
            error!(source, error = %e, "Failed to save card");
            self.send_status(agent, JobStatus::Error, format!("Failed to save card: {}", e))
                .await;
            return;
        }

        let name = extraction.card.data.name.clone();
        self.send_status(
            agent,
            JobStatus::Completed,
            format!("Successfully extracted and saved {}.", name),
        )
        .await;

        let announcement = OutgoingMessage::new_card(source, extraction.card);
        if let Err(e) = self.hub.broadcast(&announcement).await {
            warn!(error = %e, "Failed to broadcast new card");
        }
        info!(source, name = %name, "Extraction complete");
    }

    async fn send_status(&self, agent: AgentId, status: JobStatus, message: impl Into<String>) {
        let message = OutgoingMessage::status(status, message);
        if let Err(e) = self.hub.send_to(agent, &message).await {
            debug!(error = %e, "Status not delivered");
        }
    }
}
