//! # Encrypted Transport Seam
//!
//! The coordinator talks to an end-to-end encrypted pub/sub network through
//! [`EncryptedTransport`]. A subscription is a lazy, unbounded stream of
//! sealed [`Envelope`]s addressed to the local identity. Opening an envelope
//! is a separate step, so one undecryptable message never ends the stream.
//! Sending is best effort: a successful `send` says the relay accepted the
//! message, nothing more.

use async_trait::async_trait;
use cosign_core::PartyKey;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use thiserror::Error;

/// Transport failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The envelope could not be opened.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The relay refused a message for one recipient.
    #[error("delivery to {recipient} failed: {reason}")]
    Delivery {
        /// Intended recipient.
        recipient: PartyKey,
        /// Relay diagnostic.
        reason: String,
    },

    /// The subscription could not be opened, or skipped messages.
    #[error("subscription error: {0}")]
    Subscription(String),
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A sealed direct message as it arrives from the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Identity the relay attributes the message to.
    pub sender: PartyKey,
    /// Sealed payload.
    pub ciphertext: String,
}

/// Which messages a subscription delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    /// Only direct messages addressed to this identity.
    pub recipient: PartyKey,
}

impl SubscriptionFilter {
    /// Direct messages to `recipient`.
    pub fn direct_to(recipient: PartyKey) -> Self {
        Self { recipient }
    }
}

/// Stream of inbound envelopes. Ends only if the relay goes away.
pub struct Subscription {
    inner: BoxStream<'static, TransportResult<Envelope>>,
}

impl Subscription {
    /// Wrap a boxed envelope stream.
    pub fn new(inner: BoxStream<'static, TransportResult<Envelope>>) -> Self {
        Self { inner }
    }

    /// Next envelope, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<TransportResult<Envelope>> {
        self.inner.next().await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// End-to-end encrypted direct messaging.
#[async_trait]
pub trait EncryptedTransport: Send + Sync {
    /// Open a subscription. Messages published before this returns may be
    /// missed.
    async fn subscribe(&self, filter: &SubscriptionFilter) -> TransportResult<Subscription>;

    /// Open an envelope addressed to the local identity.
    async fn decrypt(&self, envelope: &Envelope) -> TransportResult<String>;

    /// Seal `plaintext` for `recipient` and hand it to the relay.
    async fn send(&self, recipient: &PartyKey, plaintext: &str) -> TransportResult<()>;
}
