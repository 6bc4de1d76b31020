//! Lottery Configuration
//!
//! Fixed at initialisation. Loaded from defaults, JSON or `LOTTO_*`
//! environment variables, and validated before any round opens.

use std::env;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::{StateHash, StateHasher};
use crate::game::fees::BPS_DENOMINATOR;
use crate::game::state::{Address, Amount};

/// Shortest allowed round duration.
pub const MIN_GAME_PERIOD_SECS: u64 = 10 * 60;

/// Configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `num_picks` is zero.
    #[error("number of picks must be greater than zero")]
    ZeroPicks,

    /// More picks than balls.
    #[error("number of picks {num_picks} exceeds max ball value {max_ball_value}")]
    PicksExceedBalls {
        /// Configured picks per ticket.
        num_picks: u8,
        /// Configured highest ball.
        max_ball_value: u8,
    },

    /// Round shorter than [`MIN_GAME_PERIOD_SECS`].
    #[error("game period of {0}s is below the minimum")]
    GamePeriodTooShort(u64),

    /// Tickets must cost something.
    #[error("ticket price must be greater than zero")]
    ZeroTicketPrice,

    /// Community plus protocol fee above 100%.
    #[error("fees of {0} bps exceed 100%")]
    FeesTooHigh(u32),

    /// Protocol fee with nowhere to send it.
    #[error("protocol fee set without a fee recipient")]
    MissingProtocolFeeRecipient,

    /// Seeding delay or minimum is zero.
    #[error("jackpot seeding delay and minimum value must both be set")]
    InvalidSeedJackpotParams,

    /// Randomness callback gas limit is zero.
    #[error("callback gas limit must be greater than zero")]
    ZeroCallbackGasLimit,

    /// An environment override does not parse.
    #[error("invalid value for {key}: {value}")]
    InvalidEnvValue {
        /// Variable name.
        key: String,
        /// Raw value found.
        value: String,
    },

    /// A JSON configuration does not parse.
    #[error("invalid config json: {0}")]
    Json(String),
}

/// Lottery parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    /// Display name, used when rendering tickets.
    pub name: String,

    /// Balls per ticket.
    pub num_picks: u8,

    /// Highest ball value (balls are 1..=max).
    pub max_ball_value: u8,

    /// Minimum seconds between round start and draw.
    pub game_period_secs: u64,

    /// Price of one ticket in the prize asset.
    pub ticket_price: Amount,

    /// Community share of ticket revenue, in basis points.
    pub community_fee_bps: u16,

    /// Protocol share of ticket revenue, in basis points.
    pub protocol_fee_bps: u16,

    /// Receiver of the protocol share.
    pub protocol_fee_recipient: Address,

    /// Minimum seconds between jackpot seedings.
    pub seed_jackpot_delay_secs: u64,

    /// Smallest accepted jackpot seeding.
    pub seed_jackpot_min_value: Amount,

    /// Gas budget passed with each randomness request.
    pub callback_gas_limit: u32,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            name: "Lotto".to_string(),
            num_picks: 5,
            max_ball_value: 36,
            game_period_secs: MIN_GAME_PERIOD_SECS,
            ticket_price: 10_000_000_000_000_000,
            community_fee_bps: 5_000,
            protocol_fee_bps: 0,
            protocol_fee_recipient: Address::ZERO,
            seed_jackpot_delay_secs: 60 * 60,
            seed_jackpot_min_value: 1_000_000_000_000_000,
            callback_gas_limit: 500_000,
        }
    }
}

impl LotteryConfig {
    /// Defaults overridden by `LOTTO_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(name) = env::var("LOTTO_NAME") {
            config.name = name;
        }
        if let Some(v) = env_parse("LOTTO_NUM_PICKS")? {
            config.num_picks = v;
        }
        if let Some(v) = env_parse("LOTTO_MAX_BALL_VALUE")? {
            config.max_ball_value = v;
        }
        if let Some(v) = env_parse("LOTTO_GAME_PERIOD_SECS")? {
            config.game_period_secs = v;
        }
        if let Some(v) = env_parse("LOTTO_TICKET_PRICE")? {
            config.ticket_price = v;
        }
        if let Some(v) = env_parse("LOTTO_COMMUNITY_FEE_BPS")? {
            config.community_fee_bps = v;
        }
        if let Some(v) = env_parse("LOTTO_PROTOCOL_FEE_BPS")? {
            config.protocol_fee_bps = v;
        }
        if let Ok(v) = env::var("LOTTO_PROTOCOL_FEE_RECIPIENT") {
            config.protocol_fee_recipient = Address::from_hex(&v).ok_or_else(|| {
                ConfigError::InvalidEnvValue {
                    key: "LOTTO_PROTOCOL_FEE_RECIPIENT".to_string(),
                    value: v.clone(),
                }
            })?;
        }
        if let Some(v) = env_parse("LOTTO_SEED_JACKPOT_DELAY_SECS")? {
            config.seed_jackpot_delay_secs = v;
        }
        if let Some(v) = env_parse("LOTTO_SEED_JACKPOT_MIN_VALUE")? {
            config.seed_jackpot_min_value = v;
        }
        if let Some(v) = env_parse("LOTTO_CALLBACK_GAS_LIMIT")? {
            config.callback_gas_limit = v;
        }

        Ok(config)
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Check every parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_picks == 0 {
            return Err(ConfigError::ZeroPicks);
        }
        if self.num_picks > self.max_ball_value {
            return Err(ConfigError::PicksExceedBalls {
                num_picks: self.num_picks,
                max_ball_value: self.max_ball_value,
            });
        }
        if self.game_period_secs < MIN_GAME_PERIOD_SECS {
            return Err(ConfigError::GamePeriodTooShort(self.game_period_secs));
        }
        if self.ticket_price == 0 {
            return Err(ConfigError::ZeroTicketPrice);
        }
        let total_fees = self.community_fee_bps as u32 + self.protocol_fee_bps as u32;
        if total_fees > BPS_DENOMINATOR as u32 {
            return Err(ConfigError::FeesTooHigh(total_fees));
        }
        if self.protocol_fee_bps > 0 && self.protocol_fee_recipient.is_zero() {
            return Err(ConfigError::MissingProtocolFeeRecipient);
        }
        if self.seed_jackpot_delay_secs == 0 || self.seed_jackpot_min_value == 0 {
            return Err(ConfigError::InvalidSeedJackpotParams);
        }
        if self.callback_gas_limit == 0 {
            return Err(ConfigError::ZeroCallbackGasLimit);
        }
        Ok(())
    }

    /// Canonical hash of all parameters.
    pub fn config_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_config();
        hasher.update_str(&self.name);
        hasher.update_u8(self.num_picks);
        hasher.update_u8(self.max_ball_value);
        hasher.update_u64(self.game_period_secs);
        hasher.update_u128(self.ticket_price);
        hasher.update_u16(self.community_fee_bps);
        hasher.update_u16(self.protocol_fee_bps);
        hasher.update_bytes(self.protocol_fee_recipient.as_bytes());
        hasher.update_u64(self.seed_jackpot_delay_secs);
        hasher.update_u128(self.seed_jackpot_min_value);
        hasher.update_u32(self.callback_gas_limit);
        hasher.finalize()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(LotteryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let base = LotteryConfig::default();

        let c = LotteryConfig { num_picks: 0, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::ZeroPicks));

        let c = LotteryConfig { num_picks: 7, max_ball_value: 6, ..base.clone() };
        assert!(matches!(c.validate(), Err(ConfigError::PicksExceedBalls { .. })));

        let c = LotteryConfig { game_period_secs: 599, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::GamePeriodTooShort(599)));

        let c = LotteryConfig { ticket_price: 0, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::ZeroTicketPrice));

        let c = LotteryConfig { community_fee_bps: 6_000, protocol_fee_bps: 4_001, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::FeesTooHigh(10_001)));

        let c = LotteryConfig { protocol_fee_bps: 100, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::MissingProtocolFeeRecipient));

        let c = LotteryConfig { seed_jackpot_min_value: 0, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::InvalidSeedJackpotParams));

        let c = LotteryConfig { seed_jackpot_delay_secs: 0, ..base.clone() };
        assert_eq!(c.validate(), Err(ConfigError::InvalidSeedJackpotParams));

        let c = LotteryConfig { callback_gas_limit: 0, ..base };
        assert_eq!(c.validate(), Err(ConfigError::ZeroCallbackGasLimit));
    }

    #[test]
    fn test_boundary_values_accepted() {
        let c = LotteryConfig {
            num_picks: 36,
            max_ball_value: 36,
            game_period_secs: MIN_GAME_PERIOD_SECS,
            community_fee_bps: 10_000,
            protocol_fee_bps: 0,
            ..Default::default()
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let c = LotteryConfig::from_json(r#"{"num_picks": 6, "max_ball_value": 49}"#).unwrap();
        assert_eq!(c.num_picks, 6);
        assert_eq!(c.max_ball_value, 49);
        assert_eq!(c.ticket_price, LotteryConfig::default().ticket_price);

        assert!(matches!(LotteryConfig::from_json("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_config_hash() {
        let a = LotteryConfig::default();
        let b = LotteryConfig { ticket_price: a.ticket_price + 1, ..a.clone() };
        assert_eq!(a.config_hash(), a.clone().config_hash());
        assert_ne!(a.config_hash(), b.config_hash());
    }
}
