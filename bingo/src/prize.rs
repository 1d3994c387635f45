//! Prize pool computation.
//!
//! Amounts are integer cents so rounding is exact: the winner receives the
//! configured share of the pot, floored to the cent.

use serde::{Deserialize, Serialize};

/// Default share of the pot paid to the winner
pub const DEFAULT_WINNER_SHARE_PERCENT: u8 = 70;

/// Pot and payout of a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizePool {
    /// Entry fee times participant count
    pub total_pool_cents: i64,
    /// Winner's payout
    pub winner_cents: i64,
}

impl PrizePool {
    /// Compute the pool for `participant_count` seats at `entry_fee_cents` each.
    pub fn new(entry_fee_cents: i64, participant_count: usize, share_percent: u8) -> Self {
        let total = i128::from(entry_fee_cents.max(0)) * participant_count as i128;
        let winner = total * i128::from(share_percent.min(100)) / 100;

        Self {
            total_pool_cents: clamp_i64(total),
            winner_cents: clamp_i64(winner),
        }
    }

    /// Pot minus the winner's share
    pub fn house_cents(&self) -> i64 {
        self.total_pool_cents - self.winner_cents
    }
}

fn clamp_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Format cents as a dollar string, e.g. `2100` -> `"21.00"`
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
