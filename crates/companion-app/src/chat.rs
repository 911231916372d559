// In-memory chat log with optimistic inserts and a local pending queue.
//
// A user message is appended before the gateway answers. If delivery fails the
// message stays in the log flagged `pending` until a flush gets it through.

use std::collections::HashSet;

use companion_core::message::{now_millis, Message, MessageIds};
use companion_gateway::{ChatTransport, GatewayError, SendOutcome};
use tracing::{debug, info, warn};

/// A pending user message waiting to be resent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub id: String,
    pub content: String,
}

/// Result of a flush pass over the pending queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub remaining: usize,
}

#[derive(Debug, Default)]
pub struct ChatState {
    messages: Vec<Message>,
    ids_in_log: HashSet<String>,
    pending_count: usize,
    ids: MessageIds,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_count(&self) -> usize {
        self.pending_count
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Trim `text` and append it as a user message. Blank input is rejected
    /// and leaves the log untouched.
    pub fn compose(&mut self, text: &str) -> Option<Message> {
        let content = text.trim();
        if content.is_empty() {
            debug!("ignoring blank input");
            return None;
        }

        let timestamp = now_millis();
        let message = Message::user(self.fresh_id(timestamp), content, timestamp);
        self.push(message.clone());
        Some(message)
    }

    /// Apply the gateway's answer to the user message `user_id`.
    ///
    /// A delivered reply is appended at the end of the log. A failure flags the
    /// user message pending and bumps the counter once.
    pub fn record_reply(&mut self, user_id: &str, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Delivered(reply) => self.append_reply(reply),
            SendOutcome::Failed(reason) => {
                warn!(id = user_id, %reason, "message not delivered, queued locally");
                self.mark_pending(user_id);
            }
        }
    }

    /// Compose, send, and record in one step. Returns `Ok(None)` for blank
    /// input, in which case the transport is never called.
    ///
    /// A `GatewayError` leaves the user message in the log without marking it
    /// pending.
    pub async fn send(
        &mut self,
        transport: &dyn ChatTransport,
        text: &str,
    ) -> Result<Option<SendOutcome>, GatewayError> {
        let Some(message) = self.compose(text) else {
            return Ok(None);
        };

        let outcome = transport.send_message(&message.content).await?;
        self.record_reply(&message.id, outcome.clone());
        Ok(Some(outcome))
    }

    /// Pending user messages in log order.
    pub fn pending(&self) -> Vec<QueuedMessage> {
        self.messages
            .iter()
            .filter(|m| m.pending)
            .map(|m| QueuedMessage {
                id: m.id.clone(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Resend every pending message in order, stopping at the first failure.
    pub async fn flush_pending(&mut self, transport: &dyn ChatTransport) -> FlushReport {
        let results = resend_in_order(transport, self.pending()).await;
        self.apply_flush(results)
    }

    /// Record the results of a resend pass produced by [`resend_in_order`].
    pub fn apply_flush(&mut self, results: Vec<(String, SendOutcome)>) -> FlushReport {
        let mut delivered = 0;
        for (id, outcome) in results {
            match outcome {
                SendOutcome::Delivered(reply) => {
                    self.clear_pending(&id);
                    self.append_reply(reply);
                    delivered += 1;
                }
                SendOutcome::Failed(reason) => {
                    debug!(id = %id, %reason, "resend failed, message stays queued");
                }
            }
        }

        let report = FlushReport {
            delivered,
            remaining: self.pending_count,
        };
        info!(
            delivered = report.delivered,
            remaining = report.remaining,
            "pending flush finished"
        );
        report
    }

    // -- internals ----------------------------------------------------------

    /// A local id not yet in the log. Server ids share the log, so a
    /// generated id can already be taken.
    fn fresh_id(&mut self, timestamp: i64) -> String {
        loop {
            let id = self.ids.next(timestamp);
            if !self.ids_in_log.contains(&id) {
                return id;
            }
        }
    }

    fn push(&mut self, message: Message) {
        self.ids_in_log.insert(message.id.clone());
        self.messages.push(message);
    }

    fn append_reply(&mut self, mut reply: Message) {
        if self.ids_in_log.contains(&reply.id) {
            let replacement = self.fresh_id(reply.timestamp);
            warn!(
                server_id = %reply.id,
                local_id = %replacement,
                "reply id already in the log, using a local id"
            );
            reply.id = replacement;
        }
        self.push(reply);
    }

    fn mark_pending(&mut self, id: &str) {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) if !message.pending => {
                message.pending = true;
                self.pending_count += 1;
            }
            Some(_) => {}
            None => warn!(id, "failed send for a message that is not in the log"),
        }
    }

    fn clear_pending(&mut self, id: &str) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            if message.pending {
                message.pending = false;
                self.pending_count -= 1;
            }
        }
    }
}

/// Send `queue` one message at a time. The returned list holds an outcome for
/// every message attempted; a `Failed` outcome, if any, is the last entry.
/// A `GatewayError` stops the pass without an entry for that message.
pub async fn resend_in_order(
    transport: &dyn ChatTransport,
    queue: Vec<QueuedMessage>,
) -> Vec<(String, SendOutcome)> {
    let mut results = Vec::with_capacity(queue.len());
    for queued in queue {
        match transport.send_message(&queued.content).await {
            Ok(outcome) => {
                let stop = !outcome.is_delivered();
                results.push((queued.id, outcome));
                if stop {
                    break;
                }
            }
            Err(e) => {
                warn!(id = %queued.id, error = %e, "resend aborted");
                break;
            }
        }
    }
    results
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
