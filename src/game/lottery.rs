//! Lottery Instance
//!
//! One lottery: configuration, the current-game pointer, the round table,
//! ticket records, the jackpot ledger and the collaborators it talks to.
//! Operations live in `purchase`, `draw`, `claim` and `admin`; this file
//! holds the struct, read accessors and the all-or-nothing wrapper.

use std::sync::Arc;

use crate::core::feistel::{compute_winning_pick, Seed};
use crate::core::hash::{StateHash, StateHasher};
use crate::core::journal::JournaledMap;
use crate::core::pick::{self, PickSet};
use crate::external::{
    InMemoryAsset, InMemoryTicketLedger, MockRandomnessSource, RandomnessSource, Snapshot,
    TicketLedger, TicketRenderer, ValueAsset,
};
use crate::game::config::LotteryConfig;
use crate::game::error::LotteryError;
use crate::game::events::{LotteryEvent, LotteryEventData};
use crate::game::ledger::JackpotLedger;
use crate::game::state::{
    Address, Amount, CurrentGame, GameId, GameState, RandomnessRequest, Round, TicketRecord, TokenId,
};

/// Who is calling, when, and with how much native value attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Calling account.
    pub caller: Address,
    /// Current time in seconds.
    pub timestamp: u64,
    /// Native value sent with the call (funds randomness requests).
    pub value: Amount,
}

impl CallContext {
    /// Context with no attached value.
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self {
            caller,
            timestamp,
            value: 0,
        }
    }

    /// Attach native value.
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

/// Fixed-size fields of a lottery, saved before an operation runs.
struct Checkpoint {
    config: LotteryConfig,
    current: CurrentGame,
    ledger: JackpotLedger,
    next_token_id: TokenId,
    randomness_request: Option<RandomnessRequest>,
    final_game_id: Option<GameId>,
    last_seeded_at: Option<u64>,
    operational_balance: Amount,
    events: usize,
}

impl Checkpoint {
    fn save<L, R, A>(lottery: &Lottery<L, R, A>) -> Self {
        Self {
            config: lottery.config.clone(),
            current: lottery.current,
            ledger: lottery.ledger.clone(),
            next_token_id: lottery.next_token_id,
            randomness_request: lottery.randomness_request,
            final_game_id: lottery.final_game_id,
            last_seeded_at: lottery.last_seeded_at,
            operational_balance: lottery.operational_balance,
            events: lottery.pending_events.len(),
        }
    }

    fn restore<L, R, A>(self, lottery: &mut Lottery<L, R, A>) {
        lottery.config = self.config;
        lottery.current = self.current;
        lottery.ledger = self.ledger;
        lottery.next_token_id = self.next_token_id;
        lottery.randomness_request = self.randomness_request;
        lottery.final_game_id = self.final_game_id;
        lottery.last_seeded_at = self.last_seeded_at;
        lottery.operational_balance = self.operational_balance;
        lottery.pending_events.truncate(self.events);
    }
}

/// Lottery wired to the in-memory collaborators.
pub type InMemoryLottery = Lottery<InMemoryTicketLedger, MockRandomnessSource, InMemoryAsset>;

/// A single lottery instance.
///
/// All mutable state is owned here. Collaborators are owned too, so one
/// snapshot scope covers every side effect of an operation.
#[derive(Clone)]
pub struct Lottery<L, R, A> {
    /// Account the lottery holds funds under.
    pub(crate) address: Address,
    /// Privileged controller.
    pub(crate) owner: Address,
    pub(crate) config: LotteryConfig,
    pub(crate) current: CurrentGame,
    pub(crate) rounds: JournaledMap<GameId, Round>,
    pub(crate) ledger: JackpotLedger,

    pub(crate) tickets: JournaledMap<TokenId, TicketRecord>,
    /// Keyed by (round, pick, token) so a round's winners are one range scan.
    pub(crate) tokens_by_pick: JournaledMap<(GameId, PickSet, TokenId), ()>,
    pub(crate) next_token_id: TokenId,

    pub(crate) randomness_request: Option<RandomnessRequest>,
    /// Round after which the lottery dies, latched by `kill`.
    pub(crate) final_game_id: Option<GameId>,
    pub(crate) last_seeded_at: Option<u64>,
    /// Native balance reserved for paying randomness requests.
    pub(crate) operational_balance: Amount,
    pub(crate) beneficiaries: JournaledMap<Address, String>,

    pub(crate) pending_events: Vec<LotteryEvent>,

    pub(crate) ticket_ledger: L,
    pub(crate) randomness: R,
    pub(crate) prize_asset: A,
    pub(crate) renderer: Arc<dyn TicketRenderer>,
}

impl<L, R, A> Lottery<L, R, A>
where
    L: TicketLedger,
    R: RandomnessSource,
    A: ValueAsset,
{
    /// Create an uninitialised lottery.
    pub fn new(
        address: Address,
        owner: Address,
        ticket_ledger: L,
        randomness: R,
        prize_asset: A,
        renderer: Arc<dyn TicketRenderer>,
    ) -> Self {
        Self {
            address,
            owner,
            config: LotteryConfig::default(),
            current: CurrentGame::default(),
            rounds: JournaledMap::new(),
            ledger: JackpotLedger::new(),
            tickets: JournaledMap::new(),
            tokens_by_pick: JournaledMap::new(),
            next_token_id: 1,
            randomness_request: None,
            final_game_id: None,
            last_seeded_at: None,
            operational_balance: 0,
            beneficiaries: JournaledMap::new(),
            pending_events: Vec::new(),
            ticket_ledger,
            randomness,
            prize_asset,
            renderer,
        }
    }

    // =========================================================================
    // Operation plumbing
    // =========================================================================

    /// Run `op` so that it either fully applies or leaves no trace.
    ///
    /// Scalar fields are saved by value; the history maps and the
    /// collaborators journal what `op` touches. Cost follows the entries
    /// touched, not the size of the history.
    pub(crate) fn atomically<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, LotteryError>,
    ) -> Result<T, LotteryError> {
        let checkpoint = Checkpoint::save(self);
        self.start_snapshot();
        let result = op(self);
        self.end_snapshot(result.is_ok());
        match result {
            Ok(value) => {
                debug_assert!(
                    self.is_solvent(),
                    "lottery owes {} but holds {}",
                    self.locked_balance(),
                    self.prize_asset.balance_of(&self.address)
                );
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(error = %err, "operation rejected, state restored");
                checkpoint.restore(self);
                Err(err)
            }
        }
    }

    fn start_snapshot(&mut self) {
        self.rounds.start_snapshot();
        self.tickets.start_snapshot();
        self.tokens_by_pick.start_snapshot();
        self.beneficiaries.start_snapshot();
        self.ticket_ledger.start_snapshot();
        self.randomness.start_snapshot();
        self.prize_asset.start_snapshot();
    }

    fn end_snapshot(&mut self, keep: bool) {
        self.rounds.end_snapshot(keep);
        self.tickets.end_snapshot(keep);
        self.tokens_by_pick.end_snapshot(keep);
        self.beneficiaries.end_snapshot(keep);
        self.ticket_ledger.end_snapshot(keep);
        self.randomness.end_snapshot(keep);
        self.prize_asset.end_snapshot(keep);
    }

    pub(crate) fn require_state(&self, expected: GameState) -> Result<(), LotteryError> {
        if self.current.state != expected {
            return Err(LotteryError::UnexpectedState(self.current.state));
        }
        Ok(())
    }

    pub(crate) fn only_owner(&self, ctx: &CallContext) -> Result<(), LotteryError> {
        if ctx.caller != self.owner {
            return Err(LotteryError::Unauthorized(ctx.caller));
        }
        Ok(())
    }

    pub(crate) fn emit(&mut self, timestamp: u64, data: LotteryEventData) {
        let event = LotteryEvent::new(timestamp, self.current.id, data);
        self.pending_events.push(event);
    }

    /// Drain buffered events.
    pub fn take_events(&mut self) -> Vec<LotteryEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Account holding the lottery's funds.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Privileged controller.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Active configuration.
    pub fn config(&self) -> &LotteryConfig {
        &self.config
    }

    /// State and id of the active round.
    pub fn current_game(&self) -> CurrentGame {
        self.current
    }

    /// Live jackpot.
    pub fn jackpot(&self) -> Amount {
        self.ledger.jackpot()
    }

    /// Reserved for the previous round's claimants.
    pub fn unclaimed_payouts(&self) -> Amount {
        self.ledger.unclaimed_payouts()
    }

    /// Community fees held internally.
    pub fn accrued_community_fees(&self) -> Amount {
        self.ledger.accrued_community_fees()
    }

    /// Round data by id.
    pub fn round(&self, game_id: GameId) -> Option<&Round> {
        self.rounds.get(&game_id)
    }

    /// All rounds, ascending.
    pub fn rounds(&self) -> impl Iterator<Item = (&GameId, &Round)> {
        self.rounds.iter()
    }

    /// Record of a minted ticket (kept after burn).
    pub fn ticket(&self, token_id: TokenId) -> Option<&TicketRecord> {
        self.tickets.get(&token_id)
    }

    /// Tickets ever minted.
    pub fn total_supply(&self) -> u64 {
        self.next_token_id - 1
    }

    /// Tickets in a round holding `pick`.
    pub fn tokens_with_pick(&self, game_id: GameId, pick: PickSet) -> Vec<TokenId> {
        self.tokens_by_pick
            .range((game_id, pick, TokenId::MIN)..=(game_id, pick, TokenId::MAX))
            .map(|((_, _, token_id), _)| *token_id)
            .collect()
    }

    /// Winning tickets of a drawn round (0 if not drawn).
    pub fn num_winners(&self, game_id: GameId) -> u64 {
        self.round(game_id)
            .and_then(|r| r.winning_pick)
            .map(|pick| {
                self.tokens_by_pick
                    .range((game_id, pick, TokenId::MIN)..=(game_id, pick, TokenId::MAX))
                    .count() as u64
            })
            .unwrap_or(0)
    }

    /// Winning tickets of a round already paid.
    pub fn num_claimed_winners(&self, game_id: GameId) -> u64 {
        self.round(game_id).map(|r| r.claimed_winners).unwrap_or(0)
    }

    /// Outstanding randomness request.
    pub fn randomness_request(&self) -> Option<RandomnessRequest> {
        self.randomness_request
    }

    /// Whether the current round is the last one.
    pub fn is_terminal_pending(&self) -> bool {
        self.final_game_id.is_some()
    }

    /// Registered beneficiaries and their display names.
    pub fn beneficiaries(&self) -> Vec<(Address, String)> {
        self.beneficiaries
            .iter()
            .map(|(a, name)| (*a, name.clone()))
            .collect()
    }

    /// Native balance available for randomness requests.
    pub fn operational_balance(&self) -> Amount {
        self.operational_balance
    }

    /// Render a live ticket.
    pub fn token_uri(&self, token_id: TokenId) -> Result<String, LotteryError> {
        if self.ticket_ledger.owner_of(token_id).is_none() {
            return Err(LotteryError::NonexistentTicket(token_id));
        }
        let record = self
            .tickets
            .get(&token_id)
            .ok_or(LotteryError::NonexistentTicket(token_id))?;
        let picks = pick::decode(record.pick, self.config.num_picks);
        Ok(self
            .renderer
            .render(&self.config.name, token_id, self.config.max_ball_value, &picks))
    }

    /// Winning pick a seed would produce under this configuration.
    pub fn compute_winning_pick(&self, seed: &Seed) -> PickSet {
        compute_winning_pick(seed, self.config.num_picks, self.config.max_ball_value)
    }

    /// Current price of one randomness request.
    pub fn request_price(&self) -> Amount {
        self.randomness.request_price(self.config.callback_gas_limit)
    }

    /// Everything the lottery owes in the prize asset.
    pub fn locked_balance(&self) -> Amount {
        self.ledger.locked()
    }

    /// Whether the prize asset balance covers everything owed.
    pub fn is_solvent(&self) -> bool {
        self.prize_asset.balance_of(&self.address) >= self.ledger.locked()
    }

    /// Hash of the full lottery state, for comparing replicas.
    pub fn state_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_lottery_state();
        hasher.update_u8(self.current.state as u8);
        hasher.update_u64(self.current.id);
        self.ledger.hash_into(&mut hasher);
        hasher.update_u64(self.next_token_id);
        hasher.update_u64(self.final_game_id.map(|id| id + 1).unwrap_or(0));
        hasher.update_u64(self.randomness_request.map(|r| r.request_id).unwrap_or(0));
        hasher.update_u32(self.rounds.len() as u32);
        for (id, round) in self.rounds.iter() {
            hasher.update_u64(*id);
            round.hash_into(&mut hasher);
        }
        hasher.finalize()
    }

    /// Ticket registry.
    pub fn ticket_ledger(&self) -> &L {
        &self.ticket_ledger
    }

    /// Ticket registry, for holder-initiated transfers.
    pub fn ticket_ledger_mut(&mut self) -> &mut L {
        &mut self.ticket_ledger
    }

    /// Randomness source.
    pub fn randomness(&self) -> &R {
        &self.randomness
    }

    /// Randomness source, for driving fulfilments.
    pub fn randomness_mut(&mut self) -> &mut R {
        &mut self.randomness
    }

    /// Prize asset.
    pub fn prize_asset(&self) -> &A {
        &self.prize_asset
    }

    /// Prize asset, for funding players and simulating stray transfers.
    pub fn prize_asset_mut(&mut self) -> &mut A {
        &mut self.prize_asset
    }
}

// =============================================================================
// TESTS
// =============================================================================
