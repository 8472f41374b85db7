//! # In-Memory Relay
//!
//! A process-local stand-in for the encrypted relay network, used by tests
//! and single-process runs. Every identity has an inbox backed by a
//! `tokio::sync::broadcast` channel.
//!
//! Sealing is hex encoding behind a `memory:` tag. It provides no
//! confidentiality; it exists so that undecryptable input can be exercised.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use cosign_core::{hex, PartyKey};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::transport::{
    EncryptedTransport, Envelope, Subscription, SubscriptionFilter, TransportError,
    TransportResult,
};

/// Inbox buffer size when none is given.
pub const DEFAULT_INBOX_CAPACITY: usize = 256;

const SEAL_TAG: &str = "memory:";

/// Shared message hub. Create one per test and hand it to every
/// [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryRelay {
    inboxes: Mutex<HashMap<PartyKey, broadcast::Sender<Envelope>>>,
    unreachable: Mutex<HashSet<PartyKey>>,
    capacity: usize,
}

impl MemoryRelay {
    /// A relay with [`DEFAULT_INBOX_CAPACITY`] per inbox.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INBOX_CAPACITY)
    }

    /// A relay with a custom inbox capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inboxes: Mutex::new(HashMap::new()),
            unreachable: Mutex::new(HashSet::new()),
            capacity: capacity.max(1),
        }
    }

    fn inbox(&self, recipient: &PartyKey) -> broadcast::Sender<Envelope> {
        self.inboxes
            .lock()
            .entry(recipient.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Make deliveries to `recipient` fail (or succeed again).
    pub fn set_unreachable(&self, recipient: &PartyKey, unreachable: bool) {
        let mut guard = self.unreachable.lock();
        if unreachable {
            guard.insert(recipient.clone());
        } else {
            guard.remove(recipient);
        }
    }

    /// Put a raw envelope straight into an inbox, bypassing sealing.
    pub fn inject(&self, recipient: &PartyKey, envelope: Envelope) {
        // No subscriber is not an error; the message is simply lost.
        let _ = self.inbox(recipient).send(envelope);
    }

    fn deliver(&self, recipient: &PartyKey, envelope: Envelope) -> TransportResult<()> {
        if self.unreachable.lock().contains(recipient) {
            return Err(TransportError::Delivery {
                recipient: recipient.clone(),
                reason: "recipient unreachable".to_string(),
            });
        }
        self.inject(recipient, envelope);
        Ok(())
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// One identity's connection to a [`MemoryRelay`].
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    relay: Arc<MemoryRelay>,
    identity: PartyKey,
    echo_to_self: bool,
}

impl MemoryTransport {
    /// Connect `identity` to `relay`.
    pub fn new(relay: Arc<MemoryRelay>, identity: PartyKey) -> Self {
        Self {
            relay,
            identity,
            echo_to_self: true,
        }
    }

    /// Drop messages this identity sends to itself, like a relay that
    /// does not echo.
    pub fn without_self_echo(mut self) -> Self {
        self.echo_to_self = false;
        self
    }

    /// The connected identity.
    pub fn identity(&self) -> &PartyKey {
        &self.identity
    }

    /// Seal a plaintext the way this transport does.
    pub fn seal(plaintext: &str) -> String {
        format!("{SEAL_TAG}{}", hex::encode(plaintext.as_bytes()))
    }
}

#[async_trait]
impl EncryptedTransport for MemoryTransport {
    async fn subscribe(&self, filter: &SubscriptionFilter) -> TransportResult<Subscription> {
        let mut receiver = self.relay.inbox(&filter.recipient).subscribe();
        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(envelope) => yield Ok(envelope),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        yield Err(TransportError::Subscription(format!(
                            "inbox lagged, {skipped} message(s) skipped"
                        )));
                    }
                }
            }
        };
        Ok(Subscription::new(Box::pin(stream)))
    }

    async fn decrypt(&self, envelope: &Envelope) -> TransportResult<String> {
        let sealed = envelope
            .ciphertext
            .strip_prefix(SEAL_TAG)
            .ok_or_else(|| TransportError::Decryption("missing seal tag".to_string()))?;
        let bytes = hex::decode(sealed, "ciphertext")
            .map_err(|e| TransportError::Decryption(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| TransportError::Decryption(e.to_string()))
    }

    async fn send(&self, recipient: &PartyKey, plaintext: &str) -> TransportResult<()> {
        if !self.echo_to_self && recipient == &self.identity {
            tracing::trace!(recipient = %recipient, "self-addressed message not echoed");
            return Ok(());
        }
        self.relay.deliver(
            recipient,
            Envelope {
                sender: self.identity.clone(),
                ciphertext: Self::seal(plaintext),
            },
        )
    }
}
