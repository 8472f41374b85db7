//! # Completion and Export
//!
//! A contract is complete when every listed client and arbitrator has a
//! recorded signature. `arbitratorsQuorum` governs escrow spending, not
//! export, so it plays no part here.
//!
//! Export merges the record with the signatures of listed parties only,
//! validates the result against the schema, checks every signature, and
//! refuses to hand back anything that fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cosign_core::{ContractRecord, FileHash, PartyKey, SignatureSet};
use cosign_crypto::verify_contract_signature;
use cosign_schema::{SchemaValidationError, SchemaValidator};
use serde::{Deserialize, Serialize};

use crate::approval::signable_data;
use crate::error::CoordinatorError;
use crate::store::ContractStore;

/// Validates merged artifacts before export.
pub trait ExportValidator: Send + Sync {
    /// Check one artifact.
    fn validate(&self, artifact: &serde_json::Value) -> Result<(), SchemaValidationError>;
}

impl ExportValidator for SchemaValidator {
    fn validate(&self, artifact: &serde_json::Value) -> Result<(), SchemaValidationError> {
        self.validate_signed_contract(artifact)
    }
}

/// A contract record merged with its signatures. This is the export format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedContract {
    /// The contract fields, inlined.
    #[serde(flatten)]
    pub record: ContractRecord,
    /// Signer key → hex signature.
    pub signatures: SignatureSet,
}

impl SignedContract {
    /// Pretty JSON, as written to disk.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every signature against its signer's key over the record's
    /// canonical bytes. Signatures from parties not listed on the contract
    /// are rejected as well.
    pub fn verify(&self) -> Result<(), CoordinatorError> {
        let file_hash = self.record.file_hash();
        let data = signable_data(&self.record)?;
        let family = self.record.network().family();
        for (signer, signature) in &self.signatures {
            let invalid = |source| CoordinatorError::InvalidSignature {
                file_hash: file_hash.clone(),
                signer: signer.clone(),
                source,
            };
            if !self.record.parties().contains(signer) {
                return Err(invalid(cosign_core::CryptoError::VerificationFailed(
                    "signer is not a party to the contract".to_string(),
                )));
            }
            verify_contract_signature(family, &data, signature, signer).map_err(invalid)?;
        }
        Ok(())
    }
}

/// File name an export of `document_name` is written under:
/// `<documentBaseName>.json`.
pub fn export_file_name(document_name: &str, file_hash: &FileHash) -> String {
    let stem = Path::new(document_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(file_hash.as_str());
    format!("{stem}.json")
}

/// Read-side queries over a [`ContractStore`], plus export.
#[derive(Clone)]
pub struct CompletionEngine {
    store: ContractStore,
    validator: Arc<dyn ExportValidator>,
}

impl std::fmt::Debug for CompletionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionEngine")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl CompletionEngine {
    /// Engine validating exports with `validator`.
    pub fn new(store: ContractStore, validator: Arc<dyn ExportValidator>) -> Self {
        Self { store, validator }
    }

    /// Whether `signer` has a recorded signature on `file_hash`.
    pub fn is_signed_by(&self, file_hash: &FileHash, signer: &PartyKey) -> bool {
        self.store.get_signature(file_hash, signer).is_some()
    }

    /// Required signers of `file_hash` without a signature, in order.
    ///
    /// `None` if the contract is unknown.
    pub fn missing_signers(&self, file_hash: &FileHash) -> Option<Vec<PartyKey>> {
        let record = self.store.get_contract(file_hash)?;
        let signatures = self.store.get_signatures(file_hash);
        Some(
            record
                .required_signers()
                .into_iter()
                .filter(|key| !signatures.contains_key(key))
                .collect(),
        )
    }

    /// Whether the contract is known, has signatures, and every listed
    /// client and arbitrator has signed.
    pub fn is_complete(&self, file_hash: &FileHash) -> bool {
        if self.store.get_signatures(file_hash).is_empty() {
            return false;
        }
        self.missing_signers(file_hash)
            .is_some_and(|missing| missing.is_empty())
    }

    /// Whether a locally computed document hash matches the contract.
    pub fn document_matches(&self, file_hash: &FileHash, local_document_hash: &FileHash) -> bool {
        self.store
            .get_contract(file_hash)
            .is_some_and(|record| record.document.file_hash == *local_document_hash)
    }

    /// Merge a complete contract with its signatures, validate it and verify
    /// every signature.
    ///
    /// # Errors
    ///
    /// `UnknownContract`, `Incomplete` with the missing signers,
    /// `SchemaValidation` if the merged artifact is rejected, or
    /// `InvalidSignature` if a listed party's signature does not verify.
    pub fn export_contract(&self, file_hash: &FileHash) -> Result<SignedContract, CoordinatorError> {
        let record = self
            .store
            .get_contract(file_hash)
            .ok_or_else(|| CoordinatorError::UnknownContract(file_hash.clone()))?;
        let mut signatures = self.store.get_signatures(file_hash);

        let missing: Vec<PartyKey> = record
            .required_signers()
            .into_iter()
            .filter(|key| !signatures.contains_key(key))
            .collect();
        if !missing.is_empty() || signatures.is_empty() {
            return Err(CoordinatorError::Incomplete {
                file_hash: file_hash.clone(),
                missing,
            });
        }

        let before = signatures.len();
        signatures.retain(|signer, _| record.parties().contains(signer));
        if signatures.len() != before {
            tracing::debug!(
                file_hash = %file_hash,
                dropped = before - signatures.len(),
                "signatures from unlisted keys left out of export"
            );
        }

        let signed = SignedContract { record, signatures };
        self.validator.validate(&serde_json::to_value(&signed)?)?;
        signed.verify()?;
        Ok(signed)
    }

    /// Export into `dir` as `<documentBaseName>.json`.
    pub fn export_to_file(
        &self,
        file_hash: &FileHash,
        document_name: &str,
        dir: &Path,
    ) -> Result<PathBuf, CoordinatorError> {
        let signed = self.export_contract(file_hash)?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(export_file_name(document_name, file_hash));
        std::fs::write(&path, signed.to_json_pretty()?)?;
        tracing::info!(file_hash = %file_hash, path = %path.display(), "contract exported");
        Ok(path)
    }

    /// Verify every listed party's recorded signature on `file_hash`.
    pub fn verify_signatures(&self, file_hash: &FileHash) -> Result<(), CoordinatorError> {
        let record = self
            .store
            .get_contract(file_hash)
            .ok_or_else(|| CoordinatorError::UnknownContract(file_hash.clone()))?;
        let mut signatures = self.store.get_signatures(file_hash);
        signatures.retain(|signer, _| record.parties().contains(signer));
        SignedContract { record, signatures }.verify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_core::{Network, PartyKeys};
    use cosign_crypto::SchnorrKeyPair;

    struct Parties {
        c1: SchnorrKeyPair,
        c2: SchnorrKeyPair,
        a1: SchnorrKeyPair,
    }

    fn setup() -> (CompletionEngine, ContractStore, Parties, FileHash) {
        let parties = Parties {
            c1: SchnorrKeyPair::generate(),
            c2: SchnorrKeyPair::generate(),
            a1: SchnorrKeyPair::generate(),
        };
        let file_hash = FileHash::new("abc123").unwrap();
        let store = ContractStore::new();
        store.upsert_contract(ContractRecord::new(
            file_hash.clone(),
            Network::Regtest,
            PartyKeys::new(
                vec![parties.c1.party_key(), parties.c2.party_key()],
                vec![parties.a1.party_key()],
            ),
            1,
            "bcrt1qescrow".to_string(),
        ));
        let engine = CompletionEngine::new(
            store.clone(),
            Arc::new(SchemaValidator::builtin().unwrap()),
        );
        (engine, store, parties, file_hash)
    }

    fn sign(store: &ContractStore, file_hash: &FileHash, kp: &SchnorrKeyPair) {
        let record = store.get_contract(file_hash).unwrap();
        let sig = kp.sign(record.network().family(), &signable_data(&record).unwrap());
        store.record_signature(file_hash.clone(), kp.party_key(), sig.to_hex());
    }

    #[test]
    fn completion_requires_every_listed_party() {
        let (engine, store, p, fh) = setup();
        assert!(!engine.is_complete(&fh));
        sign(&store, &fh, &p.c1);
        sign(&store, &fh, &p.a1);
        assert!(engine.is_signed_by(&fh, &p.c1.party_key()));
        assert!(!engine.is_signed_by(&fh, &p.c2.party_key()));
        assert!(!engine.is_complete(&fh));
        assert_eq!(engine.missing_signers(&fh), Some(vec![p.c2.party_key()]));
        sign(&store, &fh, &p.c2);
        assert!(engine.is_complete(&fh));
        assert_eq!(engine.missing_signers(&fh), Some(vec![]));
    }

    #[test]
    fn unknown_contract_is_never_complete() {
        let (engine, store, p, _) = setup();
        let other = FileHash::new("beef").unwrap();
        store.record_signature(other.clone(), p.c1.party_key(), "aa".to_string());
        assert!(!engine.is_complete(&other));
        assert_eq!(engine.missing_signers(&other), None);
    }

    #[test]
    fn incomplete_export_names_the_missing() {
        let (engine, store, p, fh) = setup();
        sign(&store, &fh, &p.c1);
        match engine.export_contract(&fh) {
            Err(CoordinatorError::Incomplete { missing, .. }) => {
                assert_eq!(missing, vec![p.c2.party_key(), p.a1.party_key()]);
            }
            other => panic!("expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn export_leaves_out_strangers_and_verifies() {
        let (engine, store, p, fh) = setup();
        for kp in [&p.c1, &p.c2, &p.a1] {
            sign(&store, &fh, kp);
        }
        let stranger = SchnorrKeyPair::generate();
        sign(&store, &fh, &stranger);

        let signed = engine.export_contract(&fh).unwrap();
        assert_eq!(signed.signatures.len(), 3);
        assert!(!signed.signatures.contains_key(&stranger.party_key()));
        signed.verify().unwrap();
        engine.verify_signatures(&fh).unwrap();

        let value = serde_json::to_value(&signed).unwrap();
        assert_eq!(value["document"]["fileHash"], "abc123");
        assert_eq!(value["collateral"]["multisigAddress"], "bcrt1qescrow");
    }

    #[test]
    fn export_rejects_schema_violations() {
        let (engine, store, p, fh) = setup();
        sign(&store, &fh, &p.c1);
        sign(&store, &fh, &p.a1);
        // Wrong length for a Schnorr signature.
        store.record_signature(fh.clone(), p.c2.party_key(), "abcd".to_string());
        assert!(matches!(
            engine.export_contract(&fh),
            Err(CoordinatorError::SchemaValidation(_))
        ));
    }

    #[test]
    fn forged_signature_fails_verification() {
        let (engine, store, p, fh) = setup();
        for kp in [&p.c1, &p.c2, &p.a1] {
            sign(&store, &fh, kp);
        }
        let c1_sig = store.get_signature(&fh, &p.c1.party_key()).unwrap();
        store.record_signature(fh.clone(), p.c2.party_key(), c1_sig);
        match engine.verify_signatures(&fh) {
            Err(CoordinatorError::InvalidSignature { signer, .. }) => {
                assert_eq!(signer, p.c2.party_key());
            }
            other => panic!("expected InvalidSignature, got {other:?}"),
        }
        assert!(matches!(
            engine.export_contract(&fh),
            Err(CoordinatorError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn document_match_gate() {
        let (engine, _, _, fh) = setup();
        assert!(engine.document_matches(&fh, &FileHash::new("ABC123").unwrap()));
        assert!(!engine.document_matches(&fh, &FileHash::new("abc124").unwrap()));
        assert!(!engine.document_matches(
            &FileHash::new("beef").unwrap(),
            &FileHash::new("beef").unwrap()
        ));
    }

    #[test]
    fn export_to_file_uses_document_base_name() {
        let (engine, store, p, fh) = setup();
        for kp in [&p.c1, &p.c2, &p.a1] {
            sign(&store, &fh, kp);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = engine
            .export_to_file(&fh, "lease-agreement.pdf", &dir.path().join("out"))
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "lease-agreement.json");
        let written: SignedContract =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, engine.export_contract(&fh).unwrap());
    }

    #[test]
    fn export_file_name_falls_back_to_hash() {
        let fh = FileHash::new("abc123").unwrap();
        assert_eq!(export_file_name("docs/contract.v2.pdf", &fh), "contract.v2.json");
        assert_eq!(export_file_name("", &fh), "abc123.json");
    }
}
