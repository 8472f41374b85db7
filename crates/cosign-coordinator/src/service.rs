//! # Coordinator Service
//!
//! Owns one identity's view of the co-signing session: the store, the
//! ingestion loop reading that identity's inbox, the approval controller
//! and the completion engine. Nothing is process-global; two services on
//! one relay behave like two parties.
//!
//! ```text
//! transport ──► ingestion task ──► ContractStore ◄── CompletionEngine
//!     ▲                                 │
//!     └──────── ApprovalController ◄────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use cosign_core::{FileHash, PartyKey};
use cosign_crypto::ContractSigner;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::approval::{ApprovalController, ApprovalReport};
use crate::completion::{CompletionEngine, SignedContract};
use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::ingestion::EventIngestor;
use crate::store::ContractStore;
use crate::transport::{EncryptedTransport, Subscription, SubscriptionFilter};

/// A running (or stopped) co-signing participant.
pub struct CoordinatorService {
    identity: PartyKey,
    transport: Arc<dyn EncryptedTransport>,
    config: CoordinatorConfig,
    store: ContractStore,
    ingestor: EventIngestor,
    approvals: ApprovalController,
    completion: CompletionEngine,
    running: Option<Running>,
}

struct Running {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for CoordinatorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorService")
            .field("identity", &self.identity)
            .field("config", &self.config)
            .field("running", &self.running.is_some())
            .finish_non_exhaustive()
    }
}

impl CoordinatorService {
    /// Build a stopped service for `identity`.
    ///
    /// The export validator is loaded here, so a bad schema directory fails
    /// construction rather than the first export.
    pub fn new(
        identity: PartyKey,
        transport: Arc<dyn EncryptedTransport>,
        signer: Arc<dyn ContractSigner>,
        config: CoordinatorConfig,
    ) -> Result<Self, CoordinatorError> {
        let validator = Arc::new(config.load_validator()?);
        let store = ContractStore::with_notify_capacity(config.notify_capacity);
        let ingestor = EventIngestor::new(store.clone());
        let approvals = ApprovalController::new(store.clone(), identity.clone(), signer, transport.clone())
            .record_own_approval(config.record_own_approval);
        let completion = CompletionEngine::new(store.clone(), validator);
        Ok(Self {
            identity,
            transport,
            config,
            store,
            ingestor,
            approvals,
            completion,
            running: None,
        })
    }

    /// The local identity.
    pub fn identity(&self) -> &PartyKey {
        &self.identity
    }

    /// The active configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Shared contract state. Use [`ContractStore::subscribe`] to observe it.
    pub fn store(&self) -> &ContractStore {
        &self.store
    }

    /// Completion queries and export.
    pub fn completion(&self) -> &CompletionEngine {
        &self.completion
    }

    /// Whether the ingestion loop is running.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Subscribe to the local inbox and start ingesting in the background.
    ///
    /// The subscription is open when this returns. Calling `start` on a
    /// running service does nothing.
    pub async fn start(&mut self) -> Result<(), CoordinatorError> {
        if self.is_running() {
            tracing::debug!(identity = %self.identity, "coordinator already running");
            return Ok(());
        }
        let subscription = self
            .transport
            .subscribe(&SubscriptionFilter::direct_to(self.identity.clone()))
            .await?;
        let (shutdown, stop_signal) = watch::channel(false);
        let task = tokio::spawn(run_ingestion(
            self.ingestor.clone(),
            self.transport.clone(),
            subscription,
            stop_signal,
        ));
        self.running = Some(Running { shutdown, task });
        tracing::info!(identity = %self.identity, "coordinator started");
        Ok(())
    }

    /// Stop the ingestion loop and wait for it to finish.
    pub async fn stop(&mut self) {
        let Some(Running { shutdown, task }) = self.running.take() else {
            return;
        };
        let _ = shutdown.send(true);
        if let Err(e) = task.await {
            tracing::warn!(identity = %self.identity, error = %e, "ingestion task ended abnormally");
        }
        tracing::info!(identity = %self.identity, "coordinator stopped");
    }

    /// Sign and distribute the local approval of `file_hash`.
    pub async fn approve(&self, file_hash: &FileHash) -> Result<ApprovalReport, CoordinatorError> {
        self.approvals.approve(file_hash).await
    }

    /// Export a complete contract as a validated artifact.
    pub fn export_contract(&self, file_hash: &FileHash) -> Result<SignedContract, CoordinatorError> {
        self.completion.export_contract(file_hash)
    }

    /// Export into the configured export directory.
    pub fn export_to_file(
        &self,
        file_hash: &FileHash,
        document_name: &str,
    ) -> Result<PathBuf, CoordinatorError> {
        self.completion
            .export_to_file(file_hash, document_name, &self.config.export_dir)
    }
}

impl Drop for CoordinatorService {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(true);
        }
    }
}

/// Read envelopes until told to stop or the subscription ends. Every
/// per-message failure is logged and skipped.
async fn run_ingestion(
    ingestor: EventIngestor,
    transport: Arc<dyn EncryptedTransport>,
    mut subscription: Subscription,
    mut stop_signal: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = stop_signal.changed() => break,
            next = subscription.next() => {
                let Some(item) = next else {
                    tracing::warn!("inbox subscription ended");
                    break;
                };
                let envelope = match item {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::warn!(error = %e, "inbox subscription error");
                        continue;
                    }
                };
                match ingestor.handle_envelope(transport.as_ref(), &envelope).await {
                    Ok(outcome) => tracing::trace!(?outcome, "message applied"),
                    Err(e) => tracing::warn!(
                        sender = %envelope.sender,
                        error = %e,
                        "dropped inbound message"
                    ),
                }
            }
        }
    }
}
