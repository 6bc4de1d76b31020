//! Randomness Source
//!
//! Verifiable randomness is requested with a payment and delivered later by a
//! callback into the lottery. The mock answers requests from a secret through
//! [`DeterministicRng`], so runs are reproducible.

use thiserror::Error;

use super::Snapshot;
use crate::core::journal::JournaledMap;
use crate::core::feistel::Seed;
use crate::core::rng::DeterministicRng;
use crate::game::state::{Address, Amount, RequestId};

/// Randomness source failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RandomnessError {
    /// Payment below the request price.
    #[error("payment of {paid} below request price {price}")]
    Underpaid {
        /// Payment attached.
        paid: Amount,
        /// Current request price.
        price: Amount,
    },

    /// No pending request with this id.
    #[error("unknown randomness request {0}")]
    UnknownRequest(RequestId),

    /// The source cannot take requests.
    #[error("randomness source unavailable: {0}")]
    Unavailable(String),
}

/// Source of random words consumed by the draw.
pub trait RandomnessSource: Snapshot {
    /// Identity that delivers fulfilments.
    fn address(&self) -> Address;

    /// Price of one request at the given callback gas limit.
    fn request_price(&self, callback_gas_limit: u32) -> Amount;

    /// Issue a request. Words arrive later via the lottery callback.
    fn request_randomness(
        &mut self,
        deadline: u64,
        callback_gas_limit: u32,
        payment: Amount,
    ) -> Result<RequestId, RandomnessError>;
}

/// Parameters of an unanswered request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    /// Latest acceptable fulfilment time.
    pub deadline: u64,
    /// Gas budget the callback was requested with.
    pub callback_gas_limit: u32,
}

/// In-memory source answering from a fixed secret.
#[derive(Clone, Debug)]
pub struct MockRandomnessSource {
    address: Address,
    secret: [u8; 32],
    base_price: Amount,
    price_per_gas: Amount,
    next_request_id: RequestId,
    pending: JournaledMap<RequestId, PendingRequest>,
    collected: Amount,
    /// `(next_request_id, collected)` when the open snapshot started.
    saved: Option<(RequestId, Amount)>,
}

impl MockRandomnessSource {
    /// New source. Request ids start at 1.
    pub fn new(address: Address, secret: [u8; 32]) -> Self {
        Self {
            address,
            secret,
            base_price: 0,
            price_per_gas: 0,
            next_request_id: 1,
            pending: JournaledMap::new(),
            collected: 0,
            saved: None,
        }
    }

    /// Charge `base + per_gas * gas` for each request.
    pub fn with_pricing(mut self, base_price: Amount, price_per_gas: Amount) -> Self {
        self.base_price = base_price;
        self.price_per_gas = price_per_gas;
        self
    }

    /// Requests not yet fulfilled, ascending.
    pub fn pending_requests(&self) -> Vec<RequestId> {
        self.pending.keys().copied().collect()
    }

    /// Parameters of a pending request.
    pub fn pending_request(&self, request_id: RequestId) -> Option<PendingRequest> {
        self.pending.get(&request_id).copied()
    }

    /// Most recently issued request id.
    pub fn last_request_id(&self) -> Option<RequestId> {
        self.next_request_id.checked_sub(1).filter(|id| *id > 0)
    }

    /// Total payments received.
    pub fn collected(&self) -> Amount {
        self.collected
    }

    /// Produce the words for a pending request and retire it.
    ///
    /// The words are what the source would deliver through the lottery
    /// callback; delivering them is the caller's job.
    pub fn fulfill(&mut self, request_id: RequestId) -> Result<Vec<Seed>, RandomnessError> {
        self.pending
            .remove(&request_id)
            .ok_or(RandomnessError::UnknownRequest(request_id))?;
        Ok(DeterministicRng::for_request(&self.secret, request_id).words(1))
    }
}

impl Snapshot for MockRandomnessSource {
    fn start_snapshot(&mut self) {
        self.saved.get_or_insert((self.next_request_id, self.collected));
        self.pending.start_snapshot();
    }

    fn end_snapshot(&mut self, keep: bool) {
        if let Some((next_request_id, collected)) = self.saved.take() {
            if !keep {
                self.next_request_id = next_request_id;
                self.collected = collected;
            }
        }
        self.pending.end_snapshot(keep);
    }
}

impl RandomnessSource for MockRandomnessSource {
    fn address(&self) -> Address {
        self.address
    }

    fn request_price(&self, callback_gas_limit: u32) -> Amount {
        self.price_per_gas
            .saturating_mul(Amount::from(callback_gas_limit))
            .saturating_add(self.base_price)
    }

    fn request_randomness(
        &mut self,
        deadline: u64,
        callback_gas_limit: u32,
        payment: Amount,
    ) -> Result<RequestId, RandomnessError> {
        let price = self.request_price(callback_gas_limit);
        if payment < price {
            return Err(RandomnessError::Underpaid { paid: payment, price });
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.collected += payment;
        self.pending.insert(
            request_id,
            PendingRequest {
                deadline,
                callback_gas_limit,
            },
        );

        tracing::debug!(request_id, deadline, price, "randomness requested");
        Ok(request_id)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MockRandomnessSource {
        MockRandomnessSource::new(Address::from_label("vrf"), [9u8; 32]).with_pricing(100, 2)
    }

    #[test]
    fn test_pricing() {
        let s = source();
        assert_eq!(s.request_price(500), 1_100);
        assert_eq!(s.request_price(0), 100);
    }

    #[test]
    fn test_request_and_fulfill() {
        let mut s = source();
        assert_eq!(s.last_request_id(), None);

        assert_eq!(
            s.request_randomness(30, 10, 119),
            Err(RandomnessError::Underpaid { paid: 119, price: 120 })
        );

        let id = s.request_randomness(30, 10, 120).unwrap();
        assert_eq!(id, 1);
        assert_eq!(s.last_request_id(), Some(1));
        assert_eq!(s.pending_requests(), vec![1]);
        assert_eq!(s.pending_request(1).map(|p| p.deadline), Some(30));
        assert_eq!(s.collected(), 120);

        let words = s.fulfill(id).unwrap();
        assert_eq!(words.len(), 1);
        assert!(s.pending_requests().is_empty());
        assert_eq!(s.fulfill(id), Err(RandomnessError::UnknownRequest(1)));
    }

    #[test]
    fn test_fulfilment_reproducible() {
        let mut a = source();
        let mut b = source();
        let ida = a.request_randomness(0, 1, 1_000).unwrap();
        let idb = b.request_randomness(0, 1, 1_000).unwrap();
        assert_eq!(a.fulfill(ida).unwrap(), b.fulfill(idb).unwrap());
    }

    #[test]
    fn test_snapshot_rollback_forgets_request() {
        let mut s = source();
        s.start_snapshot();
        s.request_randomness(30, 10, 500).unwrap();
        s.end_snapshot(false);

        assert_eq!(s.last_request_id(), None);
        assert_eq!(s.collected(), 0);
        assert!(s.pending_requests().is_empty());
        assert_eq!(s.request_randomness(30, 10, 500), Ok(1));
    }
}
