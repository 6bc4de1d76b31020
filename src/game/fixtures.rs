//! Test fixture: an initialised in-memory lottery with funded players.

use std::sync::Arc;

use crate::core::feistel::{winning_balls, Seed};
use crate::external::{
    InMemoryAsset, InMemoryTicketLedger, JsonTicketRenderer, MockRandomnessSource, ValueAsset,
};
use crate::game::config::LotteryConfig;
use crate::game::draw::DrawOutcome;
use crate::game::lottery::{CallContext, InMemoryLottery, Lottery};
use crate::game::state::{Address, Amount, Ticket, TokenId};

pub(crate) const START: u64 = 1_700_000_000;
pub(crate) const PLAYER_FUNDS: Amount = 100_000_000_000_000_000_000;
pub(crate) const OPERATIONAL_FUNDS: Amount = 1_000_000_000_000_000_000;

pub(crate) struct Fixture {
    pub lottery: InMemoryLottery,
    pub owner: Address,
    pub alice: Address,
    pub bob: Address,
    pub carol: Address,
    pub vrf: Address,
    pub now: u64,
}

impl Fixture {
    /// Lottery created but not initialised.
    pub fn uninitialised() -> Self {
        let address = Address::from_label("lottery");
        let owner = Address::from_label("owner");
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let carol = Address::from_label("carol");
        let vrf = Address::from_label("vrf");

        let mut asset = InMemoryAsset::new("PRIZE", address);
        for who in [owner, alice, bob, carol] {
            asset.fund(&who, PLAYER_FUNDS);
        }

        let randomness = MockRandomnessSource::new(vrf, [42u8; 32]).with_pricing(1_000, 1);
        let lottery = Lottery::new(
            address,
            owner,
            InMemoryTicketLedger::new(),
            randomness,
            asset,
            Arc::new(JsonTicketRenderer),
        );

        Self {
            lottery,
            owner,
            alice,
            bob,
            carol,
            vrf,
            now: START,
        }
    }

    /// Initialised with the default configuration and operational funds.
    pub fn new() -> Self {
        Self::with_config(LotteryConfig::default())
    }

    pub fn with_config(config: LotteryConfig) -> Self {
        let mut f = Self::uninitialised();
        let ctx = f.ctx(f.owner);
        f.lottery.initialize(&ctx, config).unwrap();
        f.lottery
            .fund_operations(&ctx.with_value(OPERATIONAL_FUNDS))
            .unwrap();
        f.lottery.take_events();
        f
    }

    pub fn ctx(&self, caller: Address) -> CallContext {
        CallContext::new(caller, self.now)
    }

    pub fn advance(&mut self, secs: u64) {
        self.now += secs;
    }

    /// Buy one ticket per pick for `who`.
    pub fn buy(&mut self, who: Address, picks: &[&[u8]]) -> Vec<TokenId> {
        let ctx = self.ctx(who);
        let tickets = picks.iter().map(|p| Ticket::new(who, p.to_vec())).collect();
        self.lottery.purchase(&ctx, tickets, None).unwrap()
    }

    /// Wait out the round and draw.
    pub fn draw(&mut self) -> DrawOutcome {
        self.advance(self.lottery.config().game_period_secs);
        let ctx = self.ctx(self.alice);
        self.lottery.draw(&ctx).unwrap()
    }

    /// Deliver `seed` for the outstanding request.
    pub fn fulfill(&mut self, seed: Seed) {
        let request_id = self.lottery.randomness_request().unwrap().request_id;
        let ctx = self.ctx(self.vrf);
        self.lottery
            .receive_random_words(&ctx, request_id, &[seed])
            .unwrap();
    }

    /// Draw and deliver `seed`, finishing the round.
    pub fn finish_round(&mut self, seed: Seed) {
        if let DrawOutcome::Requested { .. } = self.draw() {
            self.fulfill(seed);
        }
    }

    /// Balls `seed` draws under the active configuration.
    pub fn winning_balls(&self, seed: &Seed) -> Vec<u8> {
        let c = self.lottery.config();
        winning_balls(seed, c.num_picks, c.max_ball_value)
    }

    /// A valid pick guaranteed not to win for `seed`.
    pub fn losing_pick(&self, seed: &Seed) -> Vec<u8> {
        let c = self.lottery.config();
        let winning = self.winning_balls(seed);
        let mut pick: Vec<u8> = (1..=c.max_ball_value).take(c.num_picks as usize).collect();
        if pick == winning {
            pick = (1..=c.max_ball_value)
                .rev()
                .take(c.num_picks as usize)
                .collect::<Vec<u8>>()
                .into_iter()
                .rev()
                .collect();
        }
        pick
    }

    pub fn balance(&self, who: &Address) -> Amount {
        self.lottery.prize_asset().balance_of(who)
    }
}
