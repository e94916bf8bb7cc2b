//! # Lock: the time-bounded reservation primitive
//!
//! A `Lock` reserves hub liquidity (and the user's debt or withdraw
//! capacity) before a relayer fulfills a BORROW or WITHDRAW intent on a
//! spoke domain.
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐  lock   ┌────────┐  consume_lock   ┌──────────┐
//!   │ NONE ├────────▶│ ACTIVE ├────────────────▶│ CONSUMED │
//!   └──────┘         └───┬────┘                 └──────────┘
//!                        │ cancel_expired_lock
//!                        ▼
//!                  ┌───────────┐
//!                  │ CANCELLED │
//!                  └───────────┘
//! ```
//!
//! Terminal states are final: an intent that reached CONSUMED or CANCELLED
//! can never be locked again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, HubError, IntentId, IntentKind, Result};

/// The capacity a lock reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockKind {
    Borrow,
    Withdraw,
}

impl LockKind {
    /// The intent kind this lock kind settles.
    #[must_use]
    pub fn intent_kind(self) -> IntentKind {
        match self {
            Self::Borrow => IntentKind::Borrow,
            Self::Withdraw => IntentKind::Withdraw,
        }
    }
}

impl TryFrom<IntentKind> for LockKind {
    type Error = HubError;

    fn try_from(kind: IntentKind) -> Result<Self> {
        match kind {
            IntentKind::Borrow => Ok(Self::Borrow),
            IntentKind::Withdraw => Ok(Self::Withdraw),
            other => Err(HubError::UnsupportedIntentKind(other)),
        }
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.intent_kind(), f)
    }
}

/// Lifecycle state of a lock. `None` is reported for intents never locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockStatus {
    None,
    Active,
    Consumed,
    Cancelled,
}

impl LockStatus {
    /// Can a lock in this state move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::None, Self::Active) | (Self::Active, Self::Consumed | Self::Cancelled)
        )
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Consumed => write!(f, "CONSUMED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The fields a lock binds, compared field by field on consumption and on
/// fill-evidence recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockTerms {
    pub kind: LockKind,
    pub user: Address,
    pub asset: Address,
    pub amount: u128,
    pub relayer: Address,
}

impl LockTerms {
    /// Compare against `expected`, naming the first differing field.
    pub fn check(&self, expected: &Self, context: &'static str) -> Result<()> {
        let field = if self.kind != expected.kind {
            "kind"
        } else if self.user != expected.user {
            "user"
        } else if self.asset != expected.asset {
            "asset"
        } else if self.amount != expected.amount {
            "amount"
        } else if self.relayer != expected.relayer {
            "relayer"
        } else {
            return Ok(());
        };
        Err(HubError::FieldMismatch { context, field })
    }
}

/// A reservation created for one intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub intent_id: IntentId,
    pub terms: LockTerms,
    /// Unix seconds when the lock was created.
    pub created_at: u64,
    /// Unix seconds after which the lock can no longer be consumed.
    pub expiry: u64,
    pub status: LockStatus,
}

impl Lock {
    /// True while ACTIVE, regardless of expiry.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == LockStatus::Active
    }

    /// Consumable: ACTIVE and `now ≤ expiry`.
    #[must_use]
    pub fn is_live(&self, now: u64) -> bool {
        self.is_active() && now <= self.expiry
    }

    /// Transition ACTIVE → CONSUMED.
    pub fn mark_consumed(&mut self) -> Result<()> {
        self.transition(LockStatus::Consumed)
    }

    /// Transition ACTIVE → CANCELLED.
    pub fn mark_cancelled(&mut self) -> Result<()> {
        self.transition(LockStatus::Cancelled)
    }

    fn transition(&mut self, target: LockStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(HubError::LockNotActive {
                intent_id: self.intent_id,
                status: self.status,
            });
        }
        self.status = target;
        Ok(())
    }
}

/// Dummy lock for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Lock {
    #[must_use]
    pub fn dummy(kind: LockKind, amount: u128, expiry: u64) -> Self {
        Self {
            intent_id: IntentId(crate::B256::from(rand::random::<[u8; 32]>())),
            terms: LockTerms {
                kind,
                user: crate::random_address(),
                asset: crate::random_address(),
                amount,
                relayer: crate::random_address(),
            },
            created_at: 0,
            expiry,
            status: LockStatus::Active,
        }
    }
}
