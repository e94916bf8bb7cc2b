//! Settlement replay guards.
//!
//! Each batch, deposit and intent can be settled once. The guards are
//! write-once: nothing ever clears an entry, so a replay in any later batch
//! is rejected no matter what happened in between.

use std::collections::HashSet;

use hublend_types::{BatchId, DepositKey, HubError, IntentId, Result};

/// Exactly-once markers for batches, deposits and intents.
#[derive(Debug, Clone, Default)]
pub struct ReplayGuards {
    batches: HashSet<BatchId>,
    deposits: HashSet<DepositKey>,
    intents: HashSet<IntentId>,
}

impl ReplayGuards {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns [`HubError::BatchAlreadyExecuted`] on replay.
    pub fn mark_batch(&mut self, batch_id: BatchId) -> Result<()> {
        if !self.batches.insert(batch_id) {
            return Err(HubError::BatchAlreadyExecuted(batch_id));
        }
        Ok(())
    }

    /// # Errors
    /// Returns [`HubError::DepositAlreadySettled`] on replay.
    pub fn mark_deposit(&mut self, key: DepositKey) -> Result<()> {
        if !self.deposits.insert(key) {
            let (domain, deposit_id) = key;
            return Err(HubError::DepositAlreadySettled { domain, deposit_id });
        }
        Ok(())
    }

    /// # Errors
    /// Returns [`HubError::IntentAlreadySettled`] on replay.
    pub fn mark_intent(&mut self, intent_id: IntentId) -> Result<()> {
        if !self.intents.insert(intent_id) {
            return Err(HubError::IntentAlreadySettled(intent_id));
        }
        Ok(())
    }

    /// True once `batch_id` was marked.
    #[must_use]
    pub fn is_batch_executed(&self, batch_id: BatchId) -> bool {
        self.batches.contains(&batch_id)
    }

    /// True once the deposit under `key` was marked.
    #[must_use]
    pub fn is_deposit_settled(&self, key: DepositKey) -> bool {
        self.deposits.contains(&key)
    }

    /// True once `intent_id` was marked.
    #[must_use]
    pub fn is_intent_settled(&self, intent_id: IntentId) -> bool {
        self.intents.contains(&intent_id)
    }

    /// Number of executed batches.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}

#[cfg(test)]
mod tests {
    use hublend_types::{B256, DepositId, DomainId};

    use super::*;

    #[test]
    fn batch_replay_rejected() {
        let mut guards = ReplayGuards::new();
        let id = BatchId::from_u64(1);
        guards.mark_batch(id).unwrap();
        assert!(guards.is_batch_executed(id));
        assert_eq!(guards.mark_batch(id), Err(HubError::BatchAlreadyExecuted(id)));
        assert_eq!(guards.batch_count(), 1);
    }

    #[test]
    fn deposit_keys_scoped_by_domain() {
        let mut guards = ReplayGuards::new();
        let id = DepositId::from_u64(7);
        guards.mark_deposit((DomainId(10), id)).unwrap();
        guards.mark_deposit((DomainId(11), id)).unwrap();
        assert!(matches!(
            guards.mark_deposit((DomainId(10), id)),
            Err(HubError::DepositAlreadySettled { .. })
        ));
    }

    #[test]
    fn intent_replay_rejected() {
        let mut guards = ReplayGuards::new();
        let id = IntentId(B256::repeat_byte(3));
        assert!(!guards.is_intent_settled(id));
        guards.mark_intent(id).unwrap();
        assert_eq!(guards.mark_intent(id), Err(HubError::IntentAlreadySettled(id)));
    }
}
