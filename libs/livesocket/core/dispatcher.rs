//! Frame dispatcher
//!
//! Decodes one transport message and routes it by opcode:
//!
//! ```text
//! bytes ─> codec.decode ─> opcode 3 ─> popularity
//!                       ├> opcode 5 ─> classifier ─> ranking, chat-messages,
//!                       │                            gifts, welcomes, super-chats
//!                       ├> opcode 8 ─> connected
//!                       └> other    ─> warn, nothing published
//! ```
//!
//! Both awaits (decode, classify) are followed by a generation check so a
//! message from a replaced connection never reaches the bus.

use crate::connection_state::{AtomicMetrics, GenerationGuard};
use crate::traits::*;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a dispatch did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Popularity(u64),
    /// Number of category events published (0 for an empty batch)
    Batch(usize),
    Connected,
    Unhandled(u32),
    /// Connection was superseded mid-dispatch; nothing (more) was published
    Stale,
}

pub struct FrameDispatcher {
    codec: Arc<dyn FrameCodec>,
    classifier: Arc<dyn MessageClassifier>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<AtomicMetrics>,
}

impl FrameDispatcher {
    pub fn new(
        codec: Arc<dyn FrameCodec>,
        classifier: Arc<dyn MessageClassifier>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<AtomicMetrics>,
    ) -> Self {
        Self {
            codec,
            classifier,
            publisher,
            metrics,
        }
    }

    pub async fn dispatch(&self, message: WsMessage, guard: &GenerationGuard) -> Result<DispatchOutcome> {
        let frame = self.codec.decode(message.as_bytes()).await?;

        if !guard.is_current() {
            return Ok(DispatchOutcome::Stale);
        }

        match frame.operation() {
            Operation::Popularity => {
                let count = frame
                    .body
                    .get("count")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| LiveSocketError::MalformedBody {
                        opcode: frame.opcode,
                        reason: "missing numeric count".to_string(),
                    })?;
                self.publish(LiveEvent::Popularity(count))?;
                Ok(DispatchOutcome::Popularity(count))
            }
            Operation::Batch => self.dispatch_batch(frame.body, guard).await,
            Operation::Connected => {
                self.publish(LiveEvent::Connected)?;
                Ok(DispatchOutcome::Connected)
            }
            Operation::Unknown(op) => {
                warn!(opcode = op, body = %frame.body, "Unhandled operation");
                Ok(DispatchOutcome::Unhandled(op))
            }
        }
    }

    async fn dispatch_batch(&self, body: Value, guard: &GenerationGuard) -> Result<DispatchOutcome> {
        let messages = match body {
            Value::Array(messages) if !messages.is_empty() => messages,
            Value::Array(_) => return Ok(DispatchOutcome::Batch(0)),
            other => {
                debug!(body = %other, "Batch body is not an array, ignoring");
                return Ok(DispatchOutcome::Batch(0));
            }
        };

        let batch = self.classifier.classify(messages).await?;

        if !guard.is_current() {
            return Ok(DispatchOutcome::Stale);
        }

        let CategorizedBatch {
            ranking,
            chat,
            gifts,
            welcomes,
            super_chats,
        } = batch;

        // Fixed category order: ranking, chat, gifts, welcomes, super-chats
        let events = [
            (!ranking.is_empty()).then(|| LiveEvent::Ranking(ranking)),
            (!chat.is_empty()).then(|| LiveEvent::ChatMessages(chat)),
            (!gifts.is_empty()).then(|| LiveEvent::Gifts(gifts)),
            (!welcomes.is_empty()).then(|| LiveEvent::Welcomes(welcomes)),
            (!super_chats.is_empty()).then(|| LiveEvent::SuperChats(super_chats)),
        ];

        let mut published = 0;
        for event in events.into_iter().flatten() {
            self.publish(event)?;
            published += 1;
        }

        Ok(DispatchOutcome::Batch(published))
    }

    fn publish(&self, event: LiveEvent) -> Result<()> {
        debug!(channel = event.channel(), "Publishing event");
        self.publisher.publish(event)?;
        self.metrics.increment_published();
        Ok(())
    }
}
