//! Transaction submitter
//!
//! Drives one transaction through
//! `Built → Signing → Signed → Submitting → {Confirmed, RejectedByNode, TransportFailed}`.
//!
//! The only automatic retry is a missing-authority rejection, which loops
//! back to key resolution with the key holder's full key set. The number
//! of such round trips is bounded by `max_renegotiations`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::{ChainApi, PushTransactionResponse};
use crate::codec::{PackedTransaction, Transaction};
use crate::config::MAX_KEY_RENEGOTIATIONS;
use crate::crypto::PublicKey;
use crate::error::{ErrorCode, ErrorKind, YxError, YxResult};
use crate::serde_bytes::Bytes32;
use crate::tx::{ChainContext, DigestSigner, RequiredKeysResolver, TransactionParameters};
use crate::{log_info, log_warn};

// =============================================================================
// State machine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitState {
    Built,
    Signing,
    Signed,
    Submitting,
    Confirmed,
    RejectedByNode,
    TransportFailed,
}

impl SubmitState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SubmitState::Confirmed | SubmitState::RejectedByNode | SubmitState::TransportFailed
        )
    }

    /// Legal edges. `Submitting → Built` is the bounded re-resolution path.
    pub fn can_transition_to(self, next: SubmitState) -> bool {
        use SubmitState::*;
        matches!(
            (self, next),
            (Built, Signing)
                | (Built, TransportFailed)
                | (Signing, Signed)
                | (Signing, TransportFailed)
                | (Signed, Submitting)
                | (Submitting, Confirmed)
                | (Submitting, RejectedByNode)
                | (Submitting, TransportFailed)
                | (Submitting, Built)
        )
    }
}

/// Progress of one submission, readable after success or failure
#[derive(Debug, Clone)]
pub struct Submission {
    state: SubmitState,
    history: Vec<SubmitState>,
    renegotiations: u32,
}

impl Default for Submission {
    fn default() -> Self {
        Self {
            state: SubmitState::Built,
            history: vec![SubmitState::Built],
            renegotiations: 0,
        }
    }
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub fn history(&self) -> &[SubmitState] {
        &self.history
    }

    pub fn renegotiations(&self) -> u32 {
        self.renegotiations
    }

    fn advance(&mut self, next: SubmitState) -> YxResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(YxError::internal(format!(
                "Illegal submit transition {:?} -> {:?}",
                self.state, next
            )));
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to the terminal state matching `err` and hand it back
    pub(crate) fn fail(&mut self, err: YxError) -> YxError {
        let terminal = if err.kind() == ErrorKind::NodeRejection {
            SubmitState::RejectedByNode
        } else {
            SubmitState::TransportFailed
        };
        // Only Submitting may end in RejectedByNode
        let terminal = if self.state.can_transition_to(terminal) {
            terminal
        } else {
            SubmitState::TransportFailed
        };
        if self.state.can_transition_to(terminal) {
            self.state = terminal;
            self.history.push(terminal);
        }
        err
    }
}

/// Successful node acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitReceipt {
    pub transaction_id: Bytes32,
    pub block_num: Option<u64>,
    pub signatures: usize,
    pub renegotiations: u32,
    pub response: PushTransactionResponse,
}

// =============================================================================
// Submitter
// =============================================================================

#[derive(Clone)]
pub struct TransactionSubmitter {
    chain: Arc<dyn ChainApi>,
    resolver: RequiredKeysResolver,
    signer: DigestSigner,
    max_renegotiations: u32,
}

impl TransactionSubmitter {
    pub fn new(
        chain: Arc<dyn ChainApi>,
        resolver: RequiredKeysResolver,
        signer: DigestSigner,
        max_renegotiations: u32,
    ) -> Self {
        Self {
            chain,
            resolver,
            signer,
            max_renegotiations: max_renegotiations.min(MAX_KEY_RENEGOTIATIONS),
        }
    }

    pub fn max_renegotiations(&self) -> u32 {
        self.max_renegotiations
    }

    /// Resolve, sign and push `transaction`
    pub async fn submit(
        &self,
        context: &ChainContext,
        transaction: &Transaction,
        candidates: Vec<PublicKey>,
    ) -> YxResult<SubmitReceipt> {
        let mut submission = Submission::new();
        self.run(context, transaction, candidates, &mut submission).await
    }

    /// Same as [`submit`](Self::submit) with caller-visible progress
    pub async fn run(
        &self,
        context: &ChainContext,
        transaction: &Transaction,
        mut candidates: Vec<PublicKey>,
        submission: &mut Submission,
    ) -> YxResult<SubmitReceipt> {
        loop {
            let required = match self.resolver.resolve(transaction, &candidates).await {
                Ok(keys) => keys,
                Err(e) => return Err(submission.fail(e)),
            };

            submission.advance(SubmitState::Signing)?;
            let packed = match self.signer.sign(&context.chain_id, transaction, &required).await {
                Ok(packed) => packed,
                Err(e) => return Err(submission.fail(e)),
            };
            submission.advance(SubmitState::Signed)?;

            submission.advance(SubmitState::Submitting)?;
            match self.chain.push_transaction(&packed).await {
                Ok(response) => {
                    submission.advance(SubmitState::Confirmed)?;
                    return Ok(self.receipt(&packed, response, submission));
                }
                Err(e)
                    if e.code == ErrorCode::MissingAuthority
                        && submission.renegotiations < self.max_renegotiations =>
                {
                    submission.renegotiations += 1;
                    log_warn!(
                        "submitter",
                        "node reported missing authority, re-resolving keys",
                        tx_id = packed.id(),
                        attempt = submission.renegotiations
                    );
                    candidates = match self.expanded_candidates(&candidates).await {
                        Ok(keys) => keys,
                        Err(err) => return Err(submission.fail(err)),
                    };
                    submission.advance(SubmitState::Built)?;
                }
                Err(e) => {
                    log_warn!("submitter", "push failed", tx_id = packed.id(), code = format!("{:?}", e.code));
                    return Err(submission.fail(e));
                }
            }
        }
    }

    /// Push an already signed transaction. No renegotiation is possible.
    pub async fn push_signed(&self, packed: &PackedTransaction) -> YxResult<SubmitReceipt> {
        let mut submission = Submission {
            state: SubmitState::Signed,
            history: vec![SubmitState::Signed],
            renegotiations: 0,
        };
        submission.advance(SubmitState::Submitting)?;
        match self.chain.push_transaction(packed).await {
            Ok(response) => {
                submission.advance(SubmitState::Confirmed)?;
                Ok(self.receipt(packed, response, &submission))
            }
            Err(e) => Err(submission.fail(e)),
        }
    }

    /// Current candidates plus everything the key holder offers
    async fn expanded_candidates(&self, current: &[PublicKey]) -> YxResult<Vec<PublicKey>> {
        let mut keys = current.to_vec();
        for key in self
            .resolver
            .candidates(&TransactionParameters::default())
            .await?
        {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn receipt(
        &self,
        packed: &PackedTransaction,
        response: PushTransactionResponse,
        submission: &Submission,
    ) -> SubmitReceipt {
        log_info!(
            "submitter",
            "transaction confirmed",
            tx_id = response.transaction_id,
            block_num = response.block_num().unwrap_or_default()
        );
        SubmitReceipt {
            transaction_id: response.transaction_id,
            block_num: response.block_num(),
            signatures: packed.signatures.len(),
            renegotiations: submission.renegotiations,
            response,
        }
    }
}
