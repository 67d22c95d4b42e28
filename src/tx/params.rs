//! Per-call transaction parameters
//!
//! Values set here override the pipeline's configured defaults for a
//! single push.

use std::time::Duration;

use crate::codec::{Name, PermissionLevel};
use crate::crypto::PublicKey;
use crate::error::{YxError, YxResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionParameters {
    permissions: Vec<PermissionLevel>,
    public_keys: Vec<PublicKey>,
    fee_payer: Option<Name>,
    vote_target: Option<Name>,
    expiration: Option<Duration>,
}

impl TransactionParameters {
    pub fn builder() -> TransactionParametersBuilder {
        TransactionParametersBuilder::default()
    }

    /// Authorize as `actor@active`
    pub fn for_actor(actor: Name) -> Self {
        Self::builder().add_permission(PermissionLevel::active(actor)).build()
    }

    pub fn permissions(&self) -> &[PermissionLevel] {
        &self.permissions
    }

    /// Candidate signing keys. Empty means "ask the key holder".
    pub fn public_keys(&self) -> &[PublicKey] {
        &self.public_keys
    }

    pub fn fee_payer(&self) -> Option<&Name> {
        self.fee_payer.as_ref()
    }

    pub fn vote_target(&self) -> Option<&Name> {
        self.vote_target.as_ref()
    }

    pub fn expiration(&self) -> Option<Duration> {
        self.expiration
    }
}

/// Builder keeping permissions and keys in insertion order, without duplicates
#[derive(Debug, Default)]
pub struct TransactionParametersBuilder {
    params: TransactionParameters,
}

impl TransactionParametersBuilder {
    pub fn add_permission(mut self, level: PermissionLevel) -> Self {
        if !self.params.permissions.contains(&level) {
            self.params.permissions.push(level);
        }
        self
    }

    /// `"alice"` or `"alice@owner"`
    pub fn add_permission_str(self, level: &str) -> YxResult<Self> {
        let level = PermissionLevel::parse(level)?;
        Ok(self.add_permission(level))
    }

    pub fn add_public_key(mut self, key: PublicKey) -> Self {
        if !self.params.public_keys.contains(&key) {
            self.params.public_keys.push(key);
        }
        self
    }

    pub fn add_public_key_str(self, key: &str) -> YxResult<Self> {
        let key: PublicKey = key.parse()?;
        Ok(self.add_public_key(key))
    }

    /// Account whose `active` signature is added to pay the fee
    pub fn fee_payer(mut self, account: Name) -> Self {
        self.params.fee_payer = Some(account);
        self
    }

    /// Transaction vote target (proof-of-transaction)
    pub fn vote_target(mut self, account: Name) -> Self {
        self.params.vote_target = Some(account);
        self
    }

    pub fn expiration(mut self, expiration: Duration) -> YxResult<Self> {
        if expiration.is_zero() || expiration.as_secs() > u32::MAX as u64 {
            return Err(YxError::invalid_input("Expiration must be between 1s and u32::MAX s"));
        }
        self.params.expiration = Some(expiration);
        Ok(self)
    }

    pub fn build(self) -> TransactionParameters {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_permissions_deduplicated_in_order() {
        let params = TransactionParameters::builder()
            .add_permission_str("bob")
            .unwrap()
            .add_permission_str("alice@owner")
            .unwrap()
            .add_permission_str("bob@active")
            .unwrap()
            .build();
        let rendered: Vec<String> = params.permissions().iter().map(|p| p.to_string()).collect();
        assert_eq!(rendered, vec!["bob@active", "alice@owner"]);
    }

    #[test]
    fn test_public_keys_deduplicated() {
        let key = "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV";
        let params = TransactionParameters::builder()
            .add_public_key_str(key)
            .unwrap()
            .add_public_key_str(key)
            .unwrap()
            .build();
        assert_eq!(params.public_keys().len(), 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = TransactionParameters::builder()
            .add_permission_str("UPPER")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidName);
        assert!(TransactionParameters::builder()
            .expiration(Duration::ZERO)
            .is_err());
    }

    #[test]
    fn test_for_actor() {
        let params = TransactionParameters::for_actor(Name::new("alice").unwrap());
        assert_eq!(params.permissions()[0].to_string(), "alice@active");
        assert!(params.fee_payer().is_none());
    }
}
