//! Intent authentication and nonce tracking.
//!
//! Authentication answers one question: may this signed intent be acted on
//! now, and under which id? Nonce uniqueness lives in [`NonceRegistry`],
//! which is part of hub state so that a rejected lock leaves the nonce
//! unspent.

use std::collections::HashSet;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use hublend_types::{Address, HubError, IntentId, Result, SignedIntent, address_from_key};

/// Signature, signer and deadline checks for signed intents.
pub trait IntentAuthenticator: Send + Sync {
    /// Verify `signed` at time `now` and return its stable id.
    fn authenticate(&self, signed: &SignedIntent, now: u64) -> Result<IntentId>;
}

/// ed25519 signatures over [`hublend_types::Intent::signing_payload`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519IntentAuthenticator;

impl IntentAuthenticator for Ed25519IntentAuthenticator {
    fn authenticate(&self, signed: &SignedIntent, now: u64) -> Result<IntentId> {
        let key = VerifyingKey::from_bytes(&signed.signer).map_err(|_| HubError::InvalidSignature)?;
        let signature =
            Signature::from_slice(&signed.signature).map_err(|_| HubError::InvalidSignature)?;
        if key.verify(&signed.intent.signing_payload(), &signature).is_err() {
            tracing::debug!(signer = %hex::encode(signed.signer), "intent signature rejected");
            return Err(HubError::InvalidSignature);
        }

        let signer = address_from_key(&key);
        if signer != signed.intent.user {
            return Err(HubError::SignerMismatch {
                signer,
                user: signed.intent.user,
            });
        }
        if now > signed.intent.deadline {
            return Err(HubError::IntentExpired {
                deadline: signed.intent.deadline,
                now,
            });
        }
        Ok(signed.intent.id())
    }
}

/// `(user, nonce)` pairs already spent by accepted intents.
#[derive(Debug, Clone, Default)]
pub struct NonceRegistry {
    used: HashSet<(Address, u64)>,
}

impl NonceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend a nonce.
    ///
    /// # Errors
    /// Returns `NonceAlreadyUsed` if the pair was spent before.
    pub fn consume(&mut self, user: Address, nonce: u64) -> Result<()> {
        if !self.used.insert((user, nonce)) {
            return Err(HubError::NonceAlreadyUsed { user, nonce });
        }
        Ok(())
    }

    /// True when `user` has already spent `nonce`.
    #[must_use]
    pub fn is_used(&self, user: Address, nonce: u64) -> bool {
        self.used.contains(&(user, nonce))
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::SigningKey;
    use hublend_types::{DomainId, Intent, IntentKind, test_address};
    use rand::rngs::OsRng;

    use super::*;

    fn signed(key: &SigningKey, deadline: u64) -> SignedIntent {
        let intent = Intent {
            kind: IntentKind::Borrow,
            user: address_from_key(&key.verifying_key()),
            spoke_domain_id: DomainId(10),
            token: test_address(101),
            amount: 100,
            recipient: test_address(50),
            deadline,
            nonce: 1,
        };
        SignedIntent::sign(intent, key)
    }

    #[test]
    fn valid_intent_authenticates() {
        let key = SigningKey::generate(&mut OsRng);
        let s = signed(&key, 100);
        let id = Ed25519IntentAuthenticator.authenticate(&s, 100).unwrap();
        assert_eq!(id, s.intent.id());
    }

    #[test]
    fn expired_intent_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let err = Ed25519IntentAuthenticator
            .authenticate(&signed(&key, 100), 101)
            .unwrap_err();
        assert_eq!(err, HubError::IntentExpired { deadline: 100, now: 101 });
    }

    #[test]
    fn tampered_intent_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let mut s = signed(&key, 100);
        s.intent.amount = 101;
        assert_eq!(
            Ed25519IntentAuthenticator.authenticate(&s, 0),
            Err(HubError::InvalidSignature)
        );
    }

    #[test]
    fn foreign_user_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);
        let mut intent = signed(&key, 100).intent;
        intent.user = address_from_key(&other.verifying_key());
        let s = SignedIntent::sign(intent, &key);
        assert!(matches!(
            Ed25519IntentAuthenticator.authenticate(&s, 0),
            Err(HubError::SignerMismatch { .. })
        ));
    }

    #[test]
    fn nonce_spent_once() {
        let mut nonces = NonceRegistry::new();
        nonces.consume(test_address(1), 7).unwrap();
        assert!(nonces.is_used(test_address(1), 7));
        assert!(matches!(
            nonces.consume(test_address(1), 7),
            Err(HubError::NonceAlreadyUsed { .. })
        ));
        assert!(nonces.consume(test_address(2), 7).is_ok());
    }
}
