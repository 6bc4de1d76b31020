//! Lottery Instance Management
//!
//! Hosts many independent lotteries under UUID ids. Each instance sits
//! behind its own lock, so operations on one lottery are serialised while
//! different lotteries proceed in parallel.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::hash::hash_with_domain;
use crate::external::{
    InMemoryAsset, InMemoryTicketLedger, JsonTicketRenderer, MockRandomnessSource, RandomnessSource,
};
use crate::game::config::LotteryConfig;
use crate::game::error::LotteryError;
use crate::game::lottery::{CallContext, InMemoryLottery, Lottery};
use crate::game::state::{Address, Amount, GameState};
use crate::proof::transcript::TranscriptError;
use crate::service::protocol::{
    ErrorCode, LotteryId, LotteryRequest, LotteryResponse, LotteryStatus, OperationResult,
    RequestEnvelope, ServiceError,
};

/// Manager failures.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// No lottery with this id.
    #[error("lottery {0} not found")]
    LotteryNotFound(LotteryId),

    /// Fulfilment asked for with no request outstanding.
    #[error("no randomness request outstanding")]
    NoPendingRequest,

    /// The lottery rejected the operation.
    #[error(transparent)]
    Lottery(#[from] LotteryError),

    /// Transcript export failed.
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
}

impl From<&ManagerError> for ServiceError {
    fn from(err: &ManagerError) -> Self {
        let code = match err {
            ManagerError::LotteryNotFound(_) => ErrorCode::LotteryNotFound,
            ManagerError::NoPendingRequest => ErrorCode::NoPendingRequest,
            ManagerError::Lottery(e) => ErrorCode::from(e),
            ManagerError::Transcript(_) => ErrorCode::Internal,
        };
        ServiceError::new(code, err.to_string())
    }
}

/// Parameters for creating an in-process lottery.
#[derive(Clone, Debug)]
pub struct LotterySetup {
    /// Privileged controller.
    pub owner: Address,
    /// Round parameters.
    pub config: LotteryConfig,
    /// Creation time (opens round 0).
    pub timestamp: u64,
    /// Secret of the mock randomness source. Derived from the id when unset.
    pub randomness_secret: Option<[u8; 32]>,
    /// Flat part of the randomness price.
    pub request_base_price: Amount,
    /// Per-gas part of the randomness price.
    pub request_price_per_gas: Amount,
    /// Symbol of the prize asset.
    pub prize_symbol: String,
}

impl LotterySetup {
    /// Setup with default pricing.
    pub fn new(owner: Address, config: LotteryConfig, timestamp: u64) -> Self {
        Self {
            owner,
            config,
            timestamp,
            randomness_secret: None,
            request_base_price: 1_000,
            request_price_per_gas: 1,
            prize_symbol: "PRIZE".to_string(),
        }
    }
}

/// Manages lottery instances.
pub struct LotteryManager {
    /// Live instances.
    lotteries: RwLock<BTreeMap<LotteryId, Arc<RwLock<InMemoryLottery>>>>,
}

impl LotteryManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            lotteries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create and initialise a lottery backed by in-memory collaborators.
    pub async fn create_lottery(&self, setup: LotterySetup) -> Result<LotteryId, ManagerError> {
        let id = Uuid::new_v4();
        let address = Address::from_label(&format!("lottery:{}", id));
        let source = Address::from_label(&format!("randomness:{}", id));
        let secret = setup
            .randomness_secret
            .unwrap_or_else(|| hash_with_domain(b"LOTTO_MOCK_SECRET", id.as_bytes()));

        let randomness = MockRandomnessSource::new(source, secret)
            .with_pricing(setup.request_base_price, setup.request_price_per_gas);
        let mut lottery = Lottery::new(
            address,
            setup.owner,
            InMemoryTicketLedger::new(),
            randomness,
            InMemoryAsset::new(setup.prize_symbol, address),
            Arc::new(JsonTicketRenderer),
        );
        lottery.initialize(&CallContext::new(setup.owner, setup.timestamp), setup.config)?;
        lottery.take_events();

        let mut lotteries = self.lotteries.write().await;
        lotteries.insert(id, Arc::new(RwLock::new(lottery)));

        info!(lottery_id = %id, address = %address.short(), "lottery created");
        Ok(id)
    }

    /// Get a lottery by id.
    pub async fn get_lottery(&self, id: &LotteryId) -> Option<Arc<RwLock<InMemoryLottery>>> {
        let lotteries = self.lotteries.read().await;
        lotteries.get(id).cloned()
    }

    /// Remove a lottery.
    pub async fn remove_lottery(&self, id: &LotteryId) -> bool {
        let mut lotteries = self.lotteries.write().await;
        lotteries.remove(id).is_some()
    }

    /// Number of hosted lotteries.
    pub async fn lottery_count(&self) -> usize {
        let lotteries = self.lotteries.read().await;
        lotteries.len()
    }

    /// Ids of hosted lotteries.
    pub async fn lottery_ids(&self) -> Vec<LotteryId> {
        let lotteries = self.lotteries.read().await;
        lotteries.keys().copied().collect()
    }

    /// Drop dead lotteries that hold nothing anymore. Returns how many went.
    pub async fn cleanup(&self) -> usize {
        let mut lotteries = self.lotteries.write().await;
        let mut to_remove = Vec::new();

        for (id, lottery) in lotteries.iter() {
            let l = lottery.read().await;
            if l.current_game().state == GameState::Dead
                && l.locked_balance() == 0
                && l.operational_balance() == 0
            {
                to_remove.push(*id);
            }
        }

        for id in &to_remove {
            lotteries.remove(id);
        }
        if !to_remove.is_empty() {
            info!(removed = to_remove.len(), "cleaned up dead lotteries");
        }
        to_remove.len()
    }

    /// Handle one request. Failures come back as [`LotteryResponse::Error`].
    pub async fn handle(&self, envelope: RequestEnvelope) -> LotteryResponse {
        let kind = envelope.request.kind();
        let lottery_id = envelope.lottery_id;
        match self.execute(envelope).await {
            Ok(response) => {
                debug!(%lottery_id, request = kind, "request handled");
                response
            }
            Err(err) => {
                warn!(%lottery_id, request = kind, error = %err, "request failed");
                LotteryResponse::Error((&err).into())
            }
        }
    }

    /// Handle one request, keeping the typed error.
    pub async fn execute(&self, envelope: RequestEnvelope) -> Result<LotteryResponse, ManagerError> {
        let handle = self
            .get_lottery(&envelope.lottery_id)
            .await
            .ok_or(ManagerError::LotteryNotFound(envelope.lottery_id))?;

        if envelope.request.is_read_only() {
            let lottery = handle.read().await;
            return read(&lottery, envelope.lottery_id, &envelope.request);
        }

        let mut lottery = handle.write().await;
        let ctx = CallContext::new(envelope.caller, envelope.timestamp).with_value(envelope.value);
        let result = apply(&mut lottery, &ctx, envelope.request)?;
        Ok(LotteryResponse::Executed {
            result,
            events: lottery.take_events(),
        })
    }
}

impl Default for LotteryManager {
    fn default() -> Self {
        Self::new()
    }
}

fn read(
    lottery: &InMemoryLottery,
    lottery_id: LotteryId,
    request: &LotteryRequest,
) -> Result<LotteryResponse, ManagerError> {
    match request {
        LotteryRequest::GetTranscript => {
            let bytes = lottery.transcript().to_bytes()?;
            Ok(LotteryResponse::Transcript {
                bytes: hex::encode(bytes),
            })
        }
        _ => {
            let current = lottery.current_game();
            Ok(LotteryResponse::Status(LotteryStatus {
                lottery_id,
                address: lottery.address(),
                name: lottery.config().name.clone(),
                state: current.state,
                game_id: current.id,
                tickets_sold: lottery.round(current.id).map_or(0, |r| r.tickets_sold),
                jackpot: lottery.jackpot(),
                unclaimed_payouts: lottery.unclaimed_payouts(),
                accrued_community_fees: lottery.accrued_community_fees(),
                operational_balance: lottery.operational_balance(),
                live_tickets: lottery.ticket_ledger().total_supply() as u64,
                is_terminal_pending: lottery.is_terminal_pending(),
                pending_request: lottery.randomness_request().map(|r| r.request_id),
                state_hash: hex::encode(lottery.state_hash()),
            }))
        }
    }
}

fn apply(
    lottery: &mut InMemoryLottery,
    ctx: &CallContext,
    request: LotteryRequest,
) -> Result<OperationResult, ManagerError> {
    let result = match request {
        LotteryRequest::Purchase { tickets, beneficiary } => {
            OperationResult::Tickets(lottery.purchase(ctx, tickets, beneficiary)?)
        }
        LotteryRequest::OwnerPick { tickets } => OperationResult::Tickets(lottery.owner_pick(ctx, tickets)?),
        LotteryRequest::SeedJackpot { value } => {
            lottery.seed_jackpot(ctx, value)?;
            OperationResult::Unit
        }
        LotteryRequest::Draw => OperationResult::Draw(lottery.draw(ctx)?),
        LotteryRequest::ReceiveRandomWords { request_id, words } => {
            lottery.receive_random_words(ctx, request_id, &words)?;
            OperationResult::Unit
        }
        LotteryRequest::FulfillRandomness => {
            let request_id = lottery
                .randomness_request()
                .map(|r| r.request_id)
                .ok_or(ManagerError::NoPendingRequest)?;
            let words = lottery
                .randomness_mut()
                .fulfill(request_id)
                .map_err(LotteryError::from)?;
            let source = CallContext::new(lottery.randomness().address(), ctx.timestamp);
            lottery.receive_random_words(&source, request_id, &words)?;
            OperationResult::Unit
        }
        LotteryRequest::ForceRedraw => OperationResult::Draw(lottery.force_redraw(ctx)?),
        LotteryRequest::ClaimWinnings { token_id } => OperationResult::Claim(lottery.claim_winnings(ctx, token_id)?),
        LotteryRequest::Kill => {
            lottery.kill(ctx)?;
            OperationResult::Unit
        }
        LotteryRequest::SetBeneficiary {
            beneficiary,
            display_name,
            is_beneficiary,
        } => {
            lottery.set_beneficiary(ctx, beneficiary, &display_name, is_beneficiary)?;
            OperationResult::Unit
        }
        LotteryRequest::WithdrawAccruedFees => OperationResult::Amount(lottery.withdraw_accrued_fees(ctx)?),
        LotteryRequest::FundOperations => {
            lottery.fund_operations(ctx)?;
            OperationResult::Unit
        }
        LotteryRequest::RescueOperationalFunds => OperationResult::Amount(lottery.rescue_operational_funds(ctx)?),
        LotteryRequest::RescuePrizeAsset => OperationResult::Amount(lottery.rescue_prize_asset(ctx)?),
        LotteryRequest::Faucet { account, value } => {
            if ctx.caller != lottery.owner() {
                return Err(LotteryError::Unauthorized(ctx.caller).into());
            }
            lottery.prize_asset_mut().fund(&account, value);
            OperationResult::Amount(value)
        }
        LotteryRequest::GetStatus | LotteryRequest::GetTranscript => OperationResult::Unit,
    };
    Ok(result)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::claim::ClaimOutcome;
    use crate::game::draw::DrawOutcome;
    use crate::game::state::Ticket;
    use crate::proof::{verify_transcript, LotteryTranscript};

    const START: u64 = 1_700_000_000;
    const FUNDS: Amount = 1_000_000_000_000_000_000;

    struct Harness {
        manager: LotteryManager,
        id: LotteryId,
        owner: Address,
        alice: Address,
    }

    impl Harness {
        async fn new() -> Self {
            let manager = LotteryManager::new();
            let owner = Address::from_label("owner");
            let alice = Address::from_label("alice");
            let mut setup = LotterySetup::new(owner, LotteryConfig::default(), START);
            setup.randomness_secret = Some([7u8; 32]);
            let id = manager.create_lottery(setup).await.unwrap();

            let h = Self { manager, id, owner, alice };
            h.ok(owner, START, FUNDS, LotteryRequest::FundOperations).await;
            h.ok(owner, START, 0, LotteryRequest::Faucet { account: alice, value: FUNDS })
                .await;
            h
        }

        async fn send(&self, caller: Address, timestamp: u64, value: Amount, request: LotteryRequest) -> LotteryResponse {
            self.manager
                .handle(RequestEnvelope {
                    lottery_id: self.id,
                    caller,
                    timestamp,
                    value,
                    request,
                })
                .await
        }

        async fn ok(&self, caller: Address, timestamp: u64, value: Amount, request: LotteryRequest) -> OperationResult {
            match self.send(caller, timestamp, value, request).await {
                LotteryResponse::Executed { result, .. } => result,
                other => panic!("unexpected response: {:?}", other),
            }
        }

        async fn status(&self) -> LotteryStatus {
            match self.send(self.alice, START, 0, LotteryRequest::GetStatus).await {
                LotteryResponse::Status(status) => status,
                other => panic!("unexpected response: {:?}", other),
            }
        }

        fn ticket(&self, picks: &[u8]) -> LotteryRequest {
            LotteryRequest::Purchase {
                tickets: vec![Ticket::new(self.alice, picks.to_vec())],
                beneficiary: None,
            }
        }
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let manager = LotteryManager::new();
        let setup = LotterySetup::new(Address::from_label("owner"), LotteryConfig::default(), START);
        let id = manager.create_lottery(setup).await.unwrap();
        assert_eq!(manager.lottery_count().await, 1);
        assert_eq!(manager.lottery_ids().await, vec![id]);

        let lottery = manager.get_lottery(&id).await.unwrap();
        assert_eq!(lottery.read().await.current_game().state, GameState::Purchase);

        assert!(manager.remove_lottery(&id).await);
        assert!(!manager.remove_lottery(&id).await);
        assert_eq!(manager.lottery_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let manager = LotteryManager::new();
        let config = LotteryConfig {
            num_picks: 0,
            ..Default::default()
        };
        let setup = LotterySetup::new(Address::from_label("owner"), config, START);
        let err = manager.create_lottery(setup).await.unwrap_err();
        assert!(matches!(err, ManagerError::Lottery(LotteryError::Config(_))));
        assert_eq!(manager.lottery_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_lottery() {
        let manager = LotteryManager::new();
        let response = manager
            .handle(RequestEnvelope {
                lottery_id: Uuid::new_v4(),
                caller: Address::from_label("alice"),
                timestamp: START,
                value: 0,
                request: LotteryRequest::GetStatus,
            })
            .await;
        assert_eq!(response.error_code(), Some(ErrorCode::LotteryNotFound));
    }

    #[tokio::test]
    async fn test_full_round_through_requests() {
        let h = Harness::new().await;

        let tokens = h.ok(h.alice, START + 1, 0, h.ticket(&[1, 2, 3, 4, 5])).await;
        assert_eq!(tokens, OperationResult::Tickets(vec![1]));

        let early = h.send(h.alice, START + 2, 0, LotteryRequest::Draw).await;
        assert_eq!(early.error_code(), Some(ErrorCode::WaitLonger));

        let drawn = h.ok(h.alice, START + 600, 0, LotteryRequest::Draw).await;
        assert!(matches!(drawn, OperationResult::Draw(DrawOutcome::Requested { .. })));
        assert_eq!(h.status().await.state, GameState::DrawPending);

        let response = h.send(h.alice, START + 601, 0, LotteryRequest::FulfillRandomness).await;
        let LotteryResponse::Executed { events, .. } = response else {
            panic!("fulfilment failed");
        };
        assert!(events.iter().any(|e| e.kind() == "game_finalised"));

        let status = h.status().await;
        assert_eq!(status.state, GameState::Purchase);
        assert_eq!(status.game_id, 1);
        assert_eq!(status.pending_request, None);

        let claim = h
            .ok(h.alice, START + 602, 0, LotteryRequest::ClaimWinnings { token_id: 1 })
            .await;
        assert!(matches!(claim, OperationResult::Claim(_)));
        if claim == OperationResult::Claim(ClaimOutcome::NoWin) {
            assert_eq!(h.status().await.live_tickets, 0);
        }
    }

    #[tokio::test]
    async fn test_fulfill_without_request() {
        let h = Harness::new().await;
        let response = h.send(h.alice, START, 0, LotteryRequest::FulfillRandomness).await;
        assert_eq!(response.error_code(), Some(ErrorCode::NoPendingRequest));
    }

    #[tokio::test]
    async fn test_privileged_requests_checked() {
        let h = Harness::new().await;
        let kill = h.send(h.alice, START, 0, LotteryRequest::Kill).await;
        assert_eq!(kill.error_code(), Some(ErrorCode::Unauthorized));

        let faucet = h
            .send(h.alice, START, 0, LotteryRequest::Faucet { account: h.alice, value: 1 })
            .await;
        assert_eq!(faucet.error_code(), Some(ErrorCode::Unauthorized));

        assert_eq!(h.ok(h.owner, START, 0, LotteryRequest::Kill).await, OperationResult::Unit);
        assert!(h.status().await.is_terminal_pending);
    }

    #[tokio::test]
    async fn test_failed_request_changes_nothing() {
        let h = Harness::new().await;
        let before = h.status().await;
        let response = h.send(h.alice, START, 0, h.ticket(&[1, 2, 3, 4, 99])).await;
        assert_eq!(response.error_code(), Some(ErrorCode::InvalidPick));
        assert_eq!(h.status().await, before);
    }

    #[tokio::test]
    async fn test_concurrent_purchases_serialised() {
        let h = Arc::new(Harness::new().await);
        let mut handles = Vec::new();
        for i in 0..8u8 {
            let h = Arc::clone(&h);
            handles.push(tokio::spawn(async move {
                h.ok(h.alice, START + 1, 0, h.ticket(&[1, 2, 3, 4, 5 + i])).await
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            if let OperationResult::Tickets(t) = handle.await.unwrap() {
                ids.extend(t);
            }
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
        assert_eq!(h.status().await.tickets_sold, 8);
    }

    #[tokio::test]
    async fn test_transcript_request_verifies() {
        let h = Harness::new().await;
        h.ok(h.alice, START + 1, 0, h.ticket(&[1, 2, 3, 4, 5])).await;
        h.ok(h.alice, START + 600, 0, LotteryRequest::Draw).await;
        h.ok(h.alice, START + 601, 0, LotteryRequest::FulfillRandomness).await;

        let LotteryResponse::Transcript { bytes } = h.send(h.alice, START, 0, LotteryRequest::GetTranscript).await else {
            panic!("no transcript");
        };
        let transcript = LotteryTranscript::from_bytes(&hex::decode(bytes).unwrap()).unwrap();
        assert_eq!(verify_transcript(&transcript).unwrap().draws_verified, 1);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_empty_dead_lotteries() {
        let h = Harness::new().await;
        assert_eq!(h.manager.cleanup().await, 0);

        h.ok(h.owner, START, 0, LotteryRequest::Kill).await;
        // Round 0 sold nothing: the skip finalises the terminal round.
        let drawn = h.ok(h.alice, START + 600, 0, LotteryRequest::Draw).await;
        assert!(matches!(drawn, OperationResult::Draw(DrawOutcome::Skipped { .. })));
        assert_eq!(h.status().await.state, GameState::Dead);

        // Operational funds still held.
        assert_eq!(h.manager.cleanup().await, 0);
        h.ok(h.owner, START + 601, 0, LotteryRequest::RescueOperationalFunds).await;
        assert_eq!(h.manager.cleanup().await, 1);
        assert_eq!(h.manager.lottery_count().await, 0);
    }
}
