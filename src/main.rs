//! Lotto Engine Demo
//!
//! Runs a short lottery through the service layer: a few rounds of quick
//! picks, a scheduled termination, consolation claims, and finally an
//! independent check of the exported transcript.

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lotto::{
    VERSION,
    core::rng::DeterministicRng,
    game::{Address, Amount, ClaimOutcome, GameState, LotteryConfig, Ticket, TokenId},
    proof::{verify_transcript, LotteryTranscript},
    service::{
        LotteryId, LotteryManager, LotteryRequest, LotteryResponse, LotterySetup, LotteryStatus,
        OperationResult, RequestEnvelope,
    },
};

/// Rounds played before termination is scheduled.
const OPEN_ROUNDS: u64 = 3;

/// Prize tokens handed to each player.
const PLAYER_FUNDS: Amount = 1_000_000_000_000_000_000;

/// Native balance set aside for randomness requests.
const OPERATIONAL_FUNDS: Amount = 100_000_000;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Lotto Engine v{}", VERSION);

    let config = LotteryConfig::from_env().context("invalid LOTTO_* configuration")?;
    info!(
        "Config: {} picks of 1..={}, period {}s, price {}",
        config.num_picks, config.max_ball_value, config.game_period_secs, config.ticket_price
    );

    demo_lottery(config).await
}

/// Client-side view of one demo lottery.
struct Demo {
    manager: LotteryManager,
    id: LotteryId,
    owner: Address,
    now: u64,
}

impl Demo {
    async fn call(&self, caller: Address, value: Amount, request: LotteryRequest) -> Result<OperationResult> {
        let kind = request.kind();
        let response = self
            .manager
            .handle(RequestEnvelope {
                lottery_id: self.id,
                caller,
                timestamp: self.now,
                value,
                request,
            })
            .await;
        match response {
            LotteryResponse::Executed { result, events } => {
                for event in &events {
                    info!("  event: {}", event.kind());
                }
                Ok(result)
            }
            LotteryResponse::Error(err) => bail!("{} failed ({:?}): {}", kind, err.code, err.message),
            other => bail!("{} returned unexpected response {:?}", kind, other),
        }
    }

    async fn status(&self) -> Result<LotteryStatus> {
        match self.read(LotteryRequest::GetStatus).await? {
            LotteryResponse::Status(status) => Ok(status),
            other => bail!("unexpected status response {:?}", other),
        }
    }

    async fn read(&self, request: LotteryRequest) -> Result<LotteryResponse> {
        let response = self
            .manager
            .handle(RequestEnvelope {
                lottery_id: self.id,
                caller: self.owner,
                timestamp: self.now,
                value: 0,
                request,
            })
            .await;
        if let LotteryResponse::Error(err) = &response {
            bail!("read failed ({:?}): {}", err.code, err.message);
        }
        Ok(response)
    }

    /// Draw once the period is over and have the source answer.
    async fn finish_round(&mut self, period: u64) -> Result<()> {
        self.now += period;
        let outcome = self.call(self.owner, 0, LotteryRequest::Draw).await?;
        info!("Draw: {:?}", outcome);
        if let OperationResult::Draw(lotto::DrawOutcome::Requested { .. }) = outcome {
            self.now += 5;
            self.call(self.owner, 0, LotteryRequest::FulfillRandomness).await?;
        }
        Ok(())
    }
}

/// Demo run of a short-lived lottery.
async fn demo_lottery(config: LotteryConfig) -> Result<()> {
    info!("=== Starting Demo Lottery ===");

    let start = u64::try_from(chrono::Utc::now().timestamp()).context("clock before epoch")?;
    let owner = Address::from_label("demo-owner");
    let players: Vec<Address> = ["alice", "bob", "carol", "dave"]
        .iter()
        .map(|name| Address::from_label(name))
        .collect();

    let period = config.game_period_secs;
    let (num_picks, max_ball_value) = (config.num_picks, config.max_ball_value);

    let manager = LotteryManager::new();
    let id = manager
        .create_lottery(LotterySetup::new(owner, config, start))
        .await?;
    let mut demo = Demo { manager, id, owner, now: start };

    info!("Lottery ID: {}", id);
    demo.call(owner, OPERATIONAL_FUNDS, LotteryRequest::FundOperations).await?;
    for player in &players {
        demo.call(owner, 0, LotteryRequest::Faucet { account: *player, value: PLAYER_FUNDS })
            .await?;
    }

    let mut rng = DeterministicRng::new(69_420);
    let mut total_paid: Amount = 0;

    for round in 0..=OPEN_ROUNDS {
        if round == OPEN_ROUNDS {
            info!("Scheduling termination after round {}", round);
            demo.call(owner, 0, LotteryRequest::Kill).await?;
        }

        let mut tokens: Vec<TokenId> = Vec::new();
        for player in &players {
            let tickets = (0..2)
                .map(|_| Ticket::new(*player, rng.quick_pick(num_picks, max_ball_value)))
                .collect();
            let request = LotteryRequest::Purchase { tickets, beneficiary: None };
            if let OperationResult::Tickets(ids) = demo.call(*player, 0, request).await? {
                tokens.extend(ids);
            }
        }

        demo.finish_round(period).await?;

        for token_id in tokens {
            let holder = players[(token_id as usize - 1) / 2 % players.len()];
            let outcome = demo.call(holder, 0, LotteryRequest::ClaimWinnings { token_id }).await?;
            if let OperationResult::Claim(claim) = outcome {
                if claim != ClaimOutcome::NoWin {
                    info!("Ticket {} won: {:?}", token_id, claim);
                }
                total_paid += claim.amount();
            }
        }

        let status = demo.status().await?;
        info!(
            "Round {} done: state={} jackpot={} unclaimed={} fees={}",
            round, status.state, status.jackpot, status.unclaimed_payouts, status.accrued_community_fees
        );
    }

    let status = demo.status().await?;
    if status.state != GameState::Dead {
        bail!("lottery should be dead, is {}", status.state);
    }
    info!("Total paid out: {}", total_paid);

    if status.accrued_community_fees > 0 {
        let fees = demo.call(owner, 0, LotteryRequest::WithdrawAccruedFees).await?;
        info!("Fees withdrawn: {:?}", fees);
    }
    let excess = demo.call(owner, 0, LotteryRequest::RescuePrizeAsset).await?;
    info!("Excess rescued: {:?}", excess);

    // Verify the transcript independently
    info!("=== Verifying Transcript ===");
    let LotteryResponse::Transcript { bytes } = demo.read(LotteryRequest::GetTranscript).await? else {
        bail!("no transcript returned");
    };
    let raw = hex::decode(&bytes).context("transcript is not hex")?;
    let transcript = LotteryTranscript::from_bytes(&raw)?;
    let summary = verify_transcript(&transcript)?;
    info!(
        "Transcript OK: {} rounds, {} draws re-derived, {} bytes",
        summary.rounds_checked,
        summary.draws_verified,
        raw.len()
    );
    info!("State hash: {}", hex::encode(transcript.state_hash));

    info!("=== Demo Complete ===");
    Ok(())
}
