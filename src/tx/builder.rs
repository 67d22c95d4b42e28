//! Transaction assembly
//!
//! Turns a list of actions plus a recent chain head into a canonical
//! [`Transaction`]: expiration window, TAPoS reference fields, optional
//! fee payer authorization and vote-target extension.

use std::time::Duration;

use crate::api::ChainApi;
use crate::codec::{Action, Name, PermissionLevel, Transaction, TransactionExtension, TransactionHeader};
use crate::config::ClientConfig;
use crate::error::{YxError, YxResult};
use crate::log_debug;
use crate::serde_bytes::Bytes32;
use crate::tx::TransactionParameters;

/// Pipeline-level assembly knobs, overridable per call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyPolicy {
    pub expiration: Duration,
    /// Blocks behind head used as the TAPoS reference
    pub ref_block_offset: u32,
    pub vote_target: Option<Name>,
    pub fee_payer: Option<Name>,
}

impl Default for AssemblyPolicy {
    fn default() -> Self {
        Self {
            expiration: Duration::from_secs(crate::config::DEFAULT_TX_EXPIRATION_SECS),
            ref_block_offset: 0,
            vote_target: None,
            fee_payer: None,
        }
    }
}

impl AssemblyPolicy {
    pub fn from_config(config: &ClientConfig) -> YxResult<Self> {
        Ok(Self {
            expiration: Duration::from_secs(config.tx_expiration_secs),
            ref_block_offset: config.ref_block_offset,
            vote_target: config.vote_target()?,
            fee_payer: config.fee_payer()?,
        })
    }

    /// Per-call parameters take precedence over the policy
    pub fn merged(&self, params: &TransactionParameters) -> Self {
        Self {
            expiration: params.expiration().unwrap_or(self.expiration),
            ref_block_offset: self.ref_block_offset,
            vote_target: params.vote_target().cloned().or_else(|| self.vote_target.clone()),
            fee_payer: params.fee_payer().cloned().or_else(|| self.fee_payer.clone()),
        }
    }
}

/// Chain state a transaction is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainContext {
    pub chain_id: Bytes32,
    /// Head block time, epoch seconds
    pub head_time: u32,
    pub ref_block_num: u64,
    pub ref_block_id: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionAssembler {
    policy: AssemblyPolicy,
}

impl TransactionAssembler {
    pub fn new(policy: AssemblyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AssemblyPolicy {
        &self.policy
    }

    /// Fetch head info, and the offset reference block when one is configured
    pub async fn fetch_context(&self, chain: &dyn ChainApi) -> YxResult<ChainContext> {
        let info = chain.get_info().await?;
        let head_time = info.head_block_epoch()?;

        if self.policy.ref_block_offset == 0 {
            return Ok(ChainContext {
                chain_id: info.chain_id,
                head_time,
                ref_block_num: info.head_block_num,
                ref_block_id: info.head_block_id_bytes()?,
            });
        }

        let ref_num = info
            .head_block_num
            .saturating_sub(self.policy.ref_block_offset as u64)
            .max(1);
        let block = chain.get_block(&ref_num.to_string()).await?;
        Ok(ChainContext {
            chain_id: info.chain_id,
            head_time,
            ref_block_num: block.block_num,
            ref_block_id: block.id_bytes()?,
        })
    }

    /// Build the transaction. Fails before any I/O on malformed input.
    pub fn assemble(
        &self,
        actions: Vec<Action>,
        context: &ChainContext,
        params: &TransactionParameters,
    ) -> YxResult<Transaction> {
        validate_actions(&actions)?;
        let policy = self.policy.merged(params);

        let expiration = (context.head_time as u64)
            .checked_add(policy.expiration.as_secs())
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| YxError::invalid_input("Expiration overflows u32 seconds"))?;

        let header = TransactionHeader::with_reference_block(
            expiration,
            context.ref_block_num,
            &context.ref_block_id,
        )?;

        let actions = match &policy.fee_payer {
            Some(payer) => with_fee_payer(actions, payer),
            None => actions,
        };

        let extensions = policy
            .vote_target
            .as_ref()
            .map(|target| vec![TransactionExtension::vote_target(target)])
            .unwrap_or_default();

        log_debug!(
            "builder",
            "assembled transaction",
            actions = actions.len(),
            expiration = expiration,
            ref_block_num = header.ref_block_num
        );

        Ok(Transaction::new(header, Vec::new(), actions, extensions))
    }
}

/// Reject inputs the node would refuse anyway
pub fn validate_actions(actions: &[Action]) -> YxResult<()> {
    if actions.is_empty() {
        return Err(YxError::invalid_transaction("Transaction has no actions"));
    }
    for (i, action) in actions.iter().enumerate() {
        if action.account.is_empty() || action.name.is_empty() {
            return Err(YxError::invalid_name(format!(
                "Action {} has an empty account or action name",
                i
            )));
        }
        if action.authorization.is_empty() {
            return Err(YxError::invalid_transaction(format!(
                "Action {} ({}::{}) has no authorization",
                i, action.account, action.name
            )));
        }
        if let Some(level) = action
            .authorization
            .iter()
            .find(|l| l.actor.is_empty() || l.permission.is_empty())
        {
            return Err(YxError::invalid_name(format!(
                "Action {} has an empty authorization '{}'",
                i, level
            )));
        }
    }
    Ok(())
}

/// The fee payer's `active` permission must authorize the first action
fn with_fee_payer(mut actions: Vec<Action>, payer: &Name) -> Vec<Action> {
    if let Some(first) = actions.first_mut() {
        *first = first.with_authorization(PermissionLevel::active(payer.clone()));
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Packable, TRANSACTION_VOTE_ACCOUNT};
    use crate::error::ErrorCode;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn transfer(actor: &str) -> Action {
        Action::new(
            name("yx.ntoken"),
            name("transfer"),
            vec![PermissionLevel::active(name(actor))],
            vec![1, 2, 3],
        )
    }

    fn context() -> ChainContext {
        let mut block_id = vec![0u8; 32];
        block_id[..4].copy_from_slice(&41394u32.to_be_bytes());
        block_id[8..12].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);
        ChainContext {
            chain_id: Bytes32([3u8; 32]),
            head_time: 1_700_000_000,
            ref_block_num: 41394,
            ref_block_id: block_id,
        }
    }

    #[test]
    fn test_default_expiration_and_reference() {
        let tx = TransactionAssembler::default()
            .assemble(vec![transfer("alice")], &context(), &TransactionParameters::default())
            .unwrap();
        assert_eq!(tx.header().expiration, 1_700_000_120);
        assert_eq!(tx.header().ref_block_num, 41394);
        assert_eq!(tx.header().ref_block_prefix, 0xddccbbaa);
        assert!(tx.extensions().is_empty());
    }

    #[test]
    fn test_rejects_empty_actions_and_authorization() {
        let assembler = TransactionAssembler::default();
        let params = TransactionParameters::default();

        let err = assembler.assemble(Vec::new(), &context(), &params).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransaction);

        let mut unauthorized = transfer("alice");
        unauthorized.authorization.clear();
        let err = assembler
            .assemble(vec![unauthorized], &context(), &params)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransaction);
    }

    #[test]
    fn test_action_order_preserved() {
        let actions = vec![transfer("carol"), transfer("alice"), transfer("bob")];
        let tx = TransactionAssembler::default()
            .assemble(actions.clone(), &context(), &TransactionParameters::default())
            .unwrap();
        assert_eq!(tx.actions(), actions.as_slice());
    }

    #[test]
    fn test_vote_target_and_fee_payer_from_policy() {
        let assembler = TransactionAssembler::new(AssemblyPolicy {
            vote_target: Some(name("producer.a")),
            fee_payer: Some(name("payer")),
            ..Default::default()
        });
        let tx = assembler
            .assemble(
                vec![transfer("alice"), transfer("bob")],
                &context(),
                &TransactionParameters::default(),
            )
            .unwrap();

        assert_eq!(tx.extensions().len(), 1);
        assert_eq!(tx.extensions()[0].tag, TRANSACTION_VOTE_ACCOUNT);
        assert_eq!(tx.actions()[0].authorization.len(), 2);
        assert_eq!(tx.actions()[0].authorization[1].actor, name("payer"));
        assert_eq!(tx.actions()[1].authorization.len(), 1);
    }

    #[test]
    fn test_params_override_policy() {
        let assembler = TransactionAssembler::new(AssemblyPolicy {
            vote_target: Some(name("producer.a")),
            ..Default::default()
        });
        let params = TransactionParameters::builder()
            .vote_target(name("producer.b"))
            .expiration(Duration::from_secs(30))
            .unwrap()
            .build();
        let tx = assembler
            .assemble(vec![transfer("alice")], &context(), &params)
            .unwrap();
        assert_eq!(tx.header().expiration, 1_700_000_030);
        assert_eq!(
            tx.extensions()[0].data,
            name("producer.b").value().to_le_bytes().to_vec()
        );
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let assembler = TransactionAssembler::default();
        let params = TransactionParameters::default();
        let a = assembler.assemble(vec![transfer("alice")], &context(), &params).unwrap();
        let b = assembler.assemble(vec![transfer("alice")], &context(), &params).unwrap();
        assert_eq!(a.to_packed().unwrap(), b.to_packed().unwrap());
    }
}
