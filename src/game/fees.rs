//! Fee Splitting
//!
//! Ticket revenue is divided into a community share, a protocol share and
//! the jackpot share (whatever is left). Basis points, multiply then divide.

use serde::{Serialize, Deserialize};

use crate::game::state::Amount;

/// Basis points in 100%.
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Result of splitting a payment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// Accrued internally or paid to a beneficiary.
    pub community: Amount,
    /// Routed to the protocol fee recipient.
    pub protocol: Amount,
    /// Credited to the live jackpot.
    pub jackpot: Amount,
}

impl FeeSplit {
    /// Sum of all shares. Always equals the split total.
    pub fn total(&self) -> Amount {
        self.community + self.protocol + self.jackpot
    }
}

/// `floor(total * bps / 10_000)` without forming the product.
///
/// With `total = q * 10_000 + r` the result is `q * bps + r * bps / 10_000`,
/// and neither term can exceed `total` for `bps <= 10_000`.
fn bps_of(total: Amount, bps: u16) -> Amount {
    let denominator = Amount::from(BPS_DENOMINATOR);
    let bps = Amount::from(bps.min(BPS_DENOMINATOR));
    total / denominator * bps + total % denominator * bps / denominator
}

/// Split `total` by the two fee rates.
///
/// Rounding dust lands in the jackpot share. Fee rates are validated to sum to
/// at most [`BPS_DENOMINATOR`], so the subtraction cannot underflow. Exact for
/// every `total`, including amounts near `u128::MAX`.
pub fn split(total: Amount, community_fee_bps: u16, protocol_fee_bps: u16) -> FeeSplit {
    let community = bps_of(total, community_fee_bps);
    let protocol = bps_of(total, protocol_fee_bps);
    FeeSplit {
        community,
        protocol,
        jackpot: total - community - protocol,
    }
}

// =============================================================================
// TESTS
// =============================================================================
