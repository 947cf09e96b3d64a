//! Connection agent
//!
//! Pairs one live-channel connection with the hub. The writer task drains
//! the agent's outbound queue into the transport; the reader spawns a job per
//! inbound text frame. When the reader stops, for any reason, the agent
//! unregisters once, which closes the queue and ends the writer.
//!
//! Generic over the transport halves so it can run on an axum WebSocket or
//! on in-memory channels.

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use tracing::{debug, info, warn};

use crate::hub::Hub;
use crate::jobs::JobDispatcher;

/// Run an agent until its connection closes
pub async fn run_agent<W, R>(mut sink: W, mut stream: R, hub: Hub, dispatcher: JobDispatcher)
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin + Send,
{
    let registration = match hub.register().await {
        Ok(registration) => registration,
        Err(e) => {
            warn!(error = %e, "Could not register connection");
            let _ = sink.close().await;
            return;
        }
    };
    let agent_id = registration.id;
    let mut outbound = registration.outbound;
    info!(agent_id = %agent_id, "Client connected");

    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = sink.send(Message::Text(text.to_string())).await {
                debug!(agent_id = %agent_id, error = %e, "Write failed, stopping writer");
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                dispatcher.spawn(agent_id, text);
            }
            Ok(Message::Binary(bytes)) => {
                dispatcher.spawn(agent_id, String::from_utf8_lossy(&bytes).into_owned());
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(agent_id = %agent_id, error = %e, "Read failed");
                break;
            }
        }
    }

    if let Err(e) = hub.unregister(agent_id).await {
        debug!(agent_id = %agent_id, error = %e, "Unregister after hub shutdown");
    }
    if let Err(e) = writer.await {
        warn!(agent_id = %agent_id, error = %e, "Writer task failed");
    }
    info!(agent_id = %agent_id, "Client disconnected");
}
