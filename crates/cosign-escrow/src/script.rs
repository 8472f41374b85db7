//! # Arbitrated Multisig Script
//!
//! ```text
//! OP_IF
//!   n C1..Cn n OP_CHECKMULTISIG
//! OP_ELSE
//!   q A1..Am m OP_CHECKMULTISIGVERIFY
//!   1 C1..Cn n OP_CHECKMULTISIG
//! OP_ENDIF
//! ```
//!
//! The first branch is the cooperative close: every client signs. The second
//! is the dispute path: `q` of the `m` arbitrators plus any one client.
//!
//! The script is described once as a list of [`Step`]s and rendered into
//! either a Bitcoin or an Elements script, so both chain families commit to
//! the same policy.

use bitcoin::secp256k1::PublicKey;
use cosign_core::{AddressError, PartyKey};

use crate::keys::reconstruct_compressed;

/// Upper bound on clients plus arbitrators in one escrow.
pub const MAX_ESCROW_KEYS: usize = 20;

/// One element of the script template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Small integer push.
    Number(i64),
    /// Compressed public key push.
    Key(PublicKey),
    /// `OP_IF`
    If,
    /// `OP_ELSE`
    Else,
    /// `OP_ENDIF`
    EndIf,
    /// `OP_CHECKMULTISIG`
    CheckMultisig,
    /// `OP_CHECKMULTISIGVERIFY`
    CheckMultisigVerify,
}

/// Validated escrow spending policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowPolicy {
    clients: Vec<PublicKey>,
    arbitrators: Vec<PublicKey>,
    quorum: u32,
}

impl EscrowPolicy {
    /// Reconstruct every key and check the quorum against the key sets.
    pub fn new(
        clients: &[PartyKey],
        arbitrators: &[PartyKey],
        quorum: u32,
    ) -> Result<Self, AddressError> {
        let invalid = || AddressError::InvalidQuorum {
            quorum,
            clients: clients.len(),
            arbitrators: arbitrators.len(),
        };
        if clients.is_empty()
            || quorum == 0
            || quorum as usize > arbitrators.len()
            || clients.len() + arbitrators.len() > MAX_ESCROW_KEYS
        {
            return Err(invalid());
        }
        Ok(Self {
            clients: clients.iter().map(reconstruct_compressed).collect::<Result<_, _>>()?,
            arbitrators: arbitrators
                .iter()
                .map(reconstruct_compressed)
                .collect::<Result<_, _>>()?,
            quorum,
        })
    }

    /// The script template, in push order.
    pub fn steps(&self) -> Vec<Step> {
        let n = self.clients.len() as i64;
        let m = self.arbitrators.len() as i64;
        let clients = self.clients.iter().copied().map(Step::Key);

        let mut steps = vec![Step::If, Step::Number(n)];
        steps.extend(clients.clone());
        steps.extend([Step::Number(n), Step::CheckMultisig, Step::Else]);
        steps.push(Step::Number(i64::from(self.quorum)));
        steps.extend(self.arbitrators.iter().copied().map(Step::Key));
        steps.extend([Step::Number(m), Step::CheckMultisigVerify, Step::Number(1)]);
        steps.extend(clients);
        steps.extend([Step::Number(n), Step::CheckMultisig, Step::EndIf]);
        steps
    }

    /// Render as a Bitcoin witness script.
    pub fn bitcoin_script(&self) -> bitcoin::ScriptBuf {
        use bitcoin::opcodes::all as op;

        self.steps()
            .into_iter()
            .fold(bitcoin::script::Builder::new(), |b, step| match step {
                Step::Number(n) => b.push_int(n),
                Step::Key(pk) => b.push_key(&bitcoin::PublicKey::new(pk)),
                Step::If => b.push_opcode(op::OP_IF),
                Step::Else => b.push_opcode(op::OP_ELSE),
                Step::EndIf => b.push_opcode(op::OP_ENDIF),
                Step::CheckMultisig => b.push_opcode(op::OP_CHECKMULTISIG),
                Step::CheckMultisigVerify => b.push_opcode(op::OP_CHECKMULTISIGVERIFY),
            })
            .into_script()
    }

    /// Render as an Elements witness script.
    pub fn elements_script(&self) -> elements::Script {
        use elements::opcodes::all as op;

        self.steps()
            .into_iter()
            .fold(elements::script::Builder::new(), |b, step| match step {
                Step::Number(n) => b.push_int(n),
                Step::Key(pk) => b.push_slice(&pk.serialize()),
                Step::If => b.push_opcode(op::OP_IF),
                Step::Else => b.push_opcode(op::OP_ELSE),
                Step::EndIf => b.push_opcode(op::OP_ENDIF),
                Step::CheckMultisig => b.push_opcode(op::OP_CHECKMULTISIG),
                Step::CheckMultisigVerify => b.push_opcode(op::OP_CHECKMULTISIGVERIFY),
            })
            .into_script()
    }
}
