//! Custody ledger: attested cross-domain deposits awaiting settlement.
//!
//! A deposit enters when the configured attester registers it and leaves
//! exactly once, when a settlement batch consumes it into the accounting
//! ledger. Nothing else can move held funds.

use std::collections::HashMap;

use hublend_ledger::{Ledger, Registry, SettlementCap};
use hublend_types::{
    Address, CustodyDeposit, DepositAttestation, DepositKey, DepositTerms, HubError, HubEvent,
    Result, math,
};

/// Attested inbound deposits held until a settlement batch releases them
/// into the ledger.
#[derive(Debug, Clone)]
pub struct CustodyLedger {
    ledger_id: u64,
    attester: Address,
    deposits: HashMap<DepositKey, CustodyDeposit>,
    held: HashMap<Address, u128>,
}

impl CustodyLedger {
    /// # Errors
    /// `ZeroAddress` if `attester` is zero.
    pub fn new(ledger: &Ledger, attester: Address) -> Result<Self> {
        if attester == Address::ZERO {
            return Err(HubError::ZeroAddress {
                what: "deposit attester",
            });
        }
        Ok(Self {
            ledger_id: ledger.id(),
            attester,
            deposits: HashMap::new(),
            held: HashMap::new(),
        })
    }

    /// The only address allowed to register deposits.
    #[must_use]
    pub fn attester(&self) -> Address {
        self.attester
    }

    /// Register an attested deposit; its funds become held.
    pub fn register_deposit(
        &mut self,
        ledger: &mut Ledger,
        registry: &Registry,
        caller: Address,
        attestation: DepositAttestation,
    ) -> Result<()> {
        if caller != self.attester {
            return Err(HubError::Unauthorized {
                caller,
                action: "register deposit",
            });
        }
        let (domain, deposit_id) = attestation.key();
        if self.deposits.contains_key(&(domain, deposit_id)) {
            return Err(HubError::DepositAlreadyExists { domain, deposit_id });
        }
        let terms = attestation.terms;
        registry.get(terms.asset)?;
        if terms.amount == 0 {
            return Err(HubError::ZeroAmount);
        }
        if terms.user == Address::ZERO {
            return Err(HubError::ZeroAddress { what: "deposit user" });
        }

        let held = self.held.entry(terms.asset).or_default();
        *held = math::add(*held, terms.amount)?;
        self.deposits
            .insert((domain, deposit_id), CustodyDeposit::from(attestation));

        tracing::info!(
            %domain,
            %deposit_id,
            kind = %terms.kind,
            user = %terms.user,
            asset = %terms.asset,
            amount = terms.amount,
            "deposit registered"
        );
        ledger.emit(HubEvent::DepositRegistered {
            origin_domain_id: domain,
            deposit_id,
            kind: terms.kind,
            user: terms.user,
            asset: terms.asset,
            amount: terms.amount,
        });
        Ok(())
    }

    /// Release a held deposit into the accounting ledger's pool.
    /// Settlement-only; the caller books the credit.
    pub fn consume_to_ledger(
        &mut self,
        cap: &SettlementCap,
        ledger: &mut Ledger,
        key: DepositKey,
        expected: &DepositTerms,
    ) -> Result<DepositTerms> {
        if cap.ledger_id() != self.ledger_id {
            return Err(HubError::InvalidSettlement {
                reason: format!("capability does not open custody of ledger {}", self.ledger_id),
            });
        }
        ledger.verify_cap(cap)?;

        let (domain, deposit_id) = key;
        let deposit = self
            .deposits
            .get_mut(&key)
            .ok_or(HubError::DepositNotFound { domain, deposit_id })?;
        if deposit.consumed {
            return Err(HubError::DepositAlreadyConsumed { domain, deposit_id });
        }
        deposit.terms.check(expected)?;
        deposit.consumed = true;
        let terms = deposit.terms;

        let held = self.held.entry(terms.asset).or_default();
        *held = math::sub(*held, terms.amount)?;

        tracing::debug!(%domain, %deposit_id, amount = terms.amount, "deposit consumed");
        ledger.emit(HubEvent::DepositConsumed {
            origin_domain_id: domain,
            deposit_id,
        });
        Ok(terms)
    }

    /// The deposit registered under `key`, consumed or not.
    #[must_use]
    pub fn get(&self, key: DepositKey) -> Option<&CustodyDeposit> {
        self.deposits.get(&key)
    }

    /// Funds registered but not yet consumed, per asset.
    #[must_use]
    pub fn held(&self, asset: Address) -> u128 {
        self.held.get(&asset).copied().unwrap_or(0)
    }
}
