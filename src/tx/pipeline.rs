//! Transaction pipeline
//!
//! assemble → resolve keys → sign → submit, composed from the pieces in
//! this module. Contract-specific helpers build their actions and call
//! [`TransactionPipeline::push_actions`].

use serde_json::Value;
use std::sync::Arc;

use crate::api::{ChainApi, HttpChainApi, WalletApi};
use crate::codec::{Action, Name, PackedTransaction};
use crate::config::ClientConfig;
use crate::error::YxResult;
use crate::log_debug;
use crate::tx::{
    AssemblyPolicy, DigestSigner, KeyHolder, RequiredKeysResolver, SubmitReceipt, Submission,
    TransactionAssembler, TransactionParameters, TransactionSubmitter,
};
use crate::utils::logging;

/// Cheap to clone; clones share the underlying HTTP clients
#[derive(Clone)]
pub struct TransactionPipeline {
    config: ClientConfig,
    chain: Arc<dyn ChainApi>,
    assembler: TransactionAssembler,
    resolver: RequiredKeysResolver,
    signer: DigestSigner,
    submitter: TransactionSubmitter,
}

impl TransactionPipeline {
    pub fn new(
        config: ClientConfig,
        chain: Arc<dyn ChainApi>,
        holder: Arc<dyn KeyHolder>,
    ) -> YxResult<Self> {
        config.validate()?;
        if config.debug_logging {
            logging::enable_debug();
        }

        let assembler = TransactionAssembler::new(AssemblyPolicy::from_config(&config)?);
        let resolver = RequiredKeysResolver::new(chain.clone(), holder.clone());
        let signer = DigestSigner::new(holder);
        let submitter = TransactionSubmitter::new(
            chain.clone(),
            resolver.clone(),
            signer.clone(),
            config.max_key_renegotiations,
        );

        Ok(Self {
            config,
            chain,
            assembler,
            resolver,
            signer,
            submitter,
        })
    }

    /// HTTP node client plus the remote key daemon
    pub fn from_config(config: ClientConfig) -> YxResult<Self> {
        let chain = Arc::new(HttpChainApi::new(&config)?);
        let wallet = Arc::new(WalletApi::new(&config)?);
        Self::new(config, chain, wallet)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn chain(&self) -> &Arc<dyn ChainApi> {
        &self.chain
    }

    pub fn submitter(&self) -> &TransactionSubmitter {
        &self.submitter
    }

    /// Single action with JSON arguments packed by the node's ABI.
    /// Authorization comes from `params.permissions()`.
    pub async fn push_action(
        &self,
        contract: &str,
        action: &str,
        args: &Value,
        params: &TransactionParameters,
    ) -> YxResult<SubmitReceipt> {
        let action = self.action_from_json(contract, action, args, params).await?;
        self.push_actions(vec![action], params).await
    }

    pub async fn push_actions(
        &self,
        actions: Vec<Action>,
        params: &TransactionParameters,
    ) -> YxResult<SubmitReceipt> {
        let mut submission = Submission::new();
        self.push_actions_tracked(actions, params, &mut submission).await
    }

    /// [`push_actions`](Self::push_actions) with the submit state exposed
    pub async fn push_actions_tracked(
        &self,
        actions: Vec<Action>,
        params: &TransactionParameters,
        submission: &mut Submission,
    ) -> YxResult<SubmitReceipt> {
        crate::tx::validate_actions(&actions)?;
        // Past validation every failure must leave the submission terminal
        let context = match self.assembler.fetch_context(self.chain.as_ref()).await {
            Ok(context) => context,
            Err(e) => return Err(submission.fail(e)),
        };
        let transaction = match self.assembler.assemble(actions, &context, params) {
            Ok(tx) => tx,
            Err(e) => return Err(submission.fail(e)),
        };
        let candidates = match self.resolver.candidates(params).await {
            Ok(keys) => keys,
            Err(e) => return Err(submission.fail(e)),
        };

        log_debug!(
            "pipeline",
            "submitting",
            actions = transaction.actions().len(),
            candidates = candidates.len()
        );
        self.submitter
            .run(&context, &transaction, candidates, submission)
            .await
    }

    /// Assemble, resolve and sign without pushing
    pub async fn sign_only(
        &self,
        actions: Vec<Action>,
        params: &TransactionParameters,
    ) -> YxResult<PackedTransaction> {
        crate::tx::validate_actions(&actions)?;
        let context = self.assembler.fetch_context(self.chain.as_ref()).await?;
        let transaction = self.assembler.assemble(actions, &context, params)?;
        let candidates = self.resolver.candidates(params).await?;
        let required = self.resolver.resolve(&transaction, &candidates).await?;
        self.signer.sign(&context.chain_id, &transaction, &required).await
    }

    async fn action_from_json(
        &self,
        contract: &str,
        action: &str,
        args: &Value,
        params: &TransactionParameters,
    ) -> YxResult<Action> {
        let account = Name::new(contract)?;
        let name = Name::new(action)?;
        let authorization = params.permissions().to_vec();
        crate::tx::validate_actions(&[Action::new(
            account.clone(),
            name.clone(),
            authorization.clone(),
            Vec::new(),
        )])?;
        let data = self.chain.abi_json_to_bin(&account, &name, args).await?;
        Ok(Action::new(account, name, authorization, data))
    }
}
