//! Bounded event mailbox between I/O tasks and the game loop
//!
//! Producers (connection handlers, in-process peers) hold cloned senders and
//! never block; the game loop drains everything pending once per frame.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Enough for several seconds of traffic from a full lobby between frames
pub const DEFAULT_CAPACITY: usize = 4096;

/// Pause between attempts while a mailbox is full
const RETRY_DELAY: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    #[error("mailbox full")]
    Full,
    #[error("mailbox closed")]
    Disconnected,
}

pub struct Mailbox<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> Mailbox<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// New producer handle
    pub fn sender(&self) -> MailboxSender<T> {
        MailboxSender {
            sender: self.sender.clone(),
        }
    }

    /// Everything pending, oldest first
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Clonable producer side
pub struct MailboxSender<T> {
    sender: Sender<T>,
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> MailboxSender<T> {
    #[inline]
    pub fn try_send(&self, item: T) -> Result<(), MailboxError> {
        self.sender.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => MailboxError::Full,
            TrySendError::Disconnected(_) => MailboxError::Disconnected,
        })
    }

    /// Wait for room instead of dropping `item`
    ///
    /// For events that must arrive (peer lifecycle). Only fails once the
    /// receiving side is gone. Yields to the runtime between attempts.
    pub async fn send_reliable(&self, mut item: T) -> Result<(), MailboxError> {
        let mut waited = false;
        loop {
            match self.sender.try_send(item) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(back)) => {
                    if !waited {
                        tracing::warn!("Mailbox full, waiting for the consumer");
                        waited = true;
                    }
                    item = back;
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(TrySendError::Disconnected(_)) => return Err(MailboxError::Disconnected),
            }
        }
    }
}
