//! Per-user update queues.
//!
//! Events of one Telegram user are handled strictly in arrival order by a
//! dedicated worker task; different users run in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::bot::Planner;
use crate::channels::IncomingMessage;

struct UserQueue {
    tx: mpsc::UnboundedSender<IncomingMessage>,
    handle: JoinHandle<()>,
}

/// Fans inbound events out to one ordered queue per sender.
pub struct Dispatcher {
    planner: Arc<Planner>,
    queues: HashMap<i64, UserQueue>,
}

impl Dispatcher {
    pub fn new(planner: Arc<Planner>) -> Self {
        Self {
            planner,
            queues: HashMap::new(),
        }
    }

    /// Enqueue an event behind the sender's earlier events.
    ///
    /// Never blocks; the sender's worker is spawned on first contact and
    /// respawned if it has died.
    pub fn dispatch(&mut self, msg: IncomingMessage) {
        let sender_id = msg.sender.id;
        let msg = match self.queues.get(&sender_id) {
            Some(queue) => match queue.tx.send(msg) {
                Ok(()) => return,
                Err(mpsc::error::SendError(msg)) => {
                    warn!(telegram_id = sender_id, "User worker gone, restarting it");
                    msg
                }
            },
            None => msg,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_user_queue(Arc::clone(&self.planner), sender_id, rx));
        if tx.send(msg).is_err() {
            error!(telegram_id = sender_id, "Fresh user queue rejected an update");
        }
        self.queues.insert(sender_id, UserQueue { tx, handle });
    }

    /// Number of users with a worker.
    pub fn active_users(&self) -> usize {
        self.queues.len()
    }

    /// Stop accepting events and wait for every queue to drain.
    pub async fn shutdown(self) {
        for (sender_id, queue) in self.queues {
            drop(queue.tx);
            if let Err(e) = queue.handle.await {
                warn!(telegram_id = sender_id, error = %e, "User worker ended abnormally");
            }
        }
    }
}

async fn run_user_queue(
    planner: Arc<Planner>,
    sender_id: i64,
    mut rx: mpsc::UnboundedReceiver<IncomingMessage>,
) {
    debug!(telegram_id = sender_id, "User worker started");
    while let Some(msg) = rx.recv().await {
        let message_id = msg.id;
        if let Err(e) = planner.handle(msg).await {
            error!(%message_id, telegram_id = sender_id, error = %e, "Failed to handle update");
        }
    }
    debug!(telegram_id = sender_id, "User worker stopped");
}
