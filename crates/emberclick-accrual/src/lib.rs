//! Lazy time-based resource accrual.
//!
//! There is no background job topping up energy or dripping card income.
//! Instead, every read or mutation of a player recomputes the current
//! value from `(stored timestamp, now)` through the pure functions in this
//! crate, and persists the result. Correctness therefore hinges on one
//! property: **repeated recomputation must never lose time**.
//!
//! Both functions guarantee it the same way — the stored timestamp only
//! advances by the amount of time actually *converted* into resource:
//!
//! - [`regenerate_energy`] leaves the timestamp untouched when the elapsed
//!   time is below one regen interval, so sub-threshold polls accumulate
//!   instead of discarding progress.
//! - [`accrue_passive_income`] advances the timestamp by the number of
//!   whole minutes consumed, never to `now`, so the sub-minute remainder
//!   survives to the next call.
//!
//! Both are total functions: no errors, no panics, caps respected, and a
//! `now` earlier than the stored timestamp (clock skew) reads as zero
//! elapsed time.

use std::time::Duration;

use emberclick_types::UnixMillis;

/// One energy point regenerates per this many milliseconds (1.5 s).
pub const ENERGY_REGEN_MILLIS: u64 = 1_500;

/// Passive income is credited in whole ticks of this length.
pub const INCOME_INTERVAL: Duration = Duration::from_secs(60);

const INCOME_INTERVAL_MILLIS: u64 = INCOME_INTERVAL.as_millis() as u64;

// ---------------------------------------------------------------------------
// Energy regeneration
// ---------------------------------------------------------------------------

/// Result of an energy recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyRegen {
    /// The recomputed energy value, clamped to the cap.
    pub energy: u32,
    /// The timestamp to persist. Unchanged from the input when nothing
    /// was restored.
    pub last_update: UnixMillis,
    /// How many points the elapsed time yielded (before cap clamping).
    pub restored: u32,
}

/// Recomputes a player's energy from elapsed wall-clock time.
///
/// - `last_update` absent: first observation. The baseline is established
///   at `now` with no retroactive credit.
/// - Fewer than [`ENERGY_REGEN_MILLIS`] elapsed: nothing restored, and the
///   stored timestamp is left alone so the fraction keeps accumulating.
/// - Otherwise: one point per full interval, clamped to `max_energy`, and
///   the timestamp moves to `now`.
///
/// The returned energy is always within `0..=max_energy`, including when
/// the input already exceeds the cap (a shrunk cap clamps on the next
/// recomputation).
pub fn regenerate_energy(
    energy: u32,
    max_energy: u32,
    last_update: Option<UnixMillis>,
    now: UnixMillis,
) -> EnergyRegen {
    let Some(last) = last_update else {
        return EnergyRegen {
            energy: energy.min(max_energy),
            last_update: now,
            restored: 0,
        };
    };

    let elapsed = now.saturating_millis_since(last);
    let restored = u32::try_from(elapsed / ENERGY_REGEN_MILLIS).unwrap_or(u32::MAX);

    if restored == 0 {
        // Sub-threshold poll: keep the old timestamp, the fractional
        // interval is not consumed.
        return EnergyRegen {
            energy: energy.min(max_energy),
            last_update: last,
            restored: 0,
        };
    }

    EnergyRegen {
        energy: energy.saturating_add(restored).min(max_energy),
        last_update: now,
        restored,
    }
}

// ---------------------------------------------------------------------------
// Passive income
// ---------------------------------------------------------------------------

/// Result of a passive-income recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomeAccrual {
    /// The new coin balance.
    pub coins: i64,
    /// How much was credited by this call (0 on baseline and
    /// sub-minute calls).
    pub credited: i64,
    /// The timestamp to persist: advanced by the consumed whole minutes,
    /// never rounded up to `now`.
    pub last_collect: UnixMillis,
}

/// Credits passive card income for the whole minutes elapsed since the
/// last collection.
///
/// - `last_collect` absent: baseline call, credits 0, stamps `now`.
/// - Less than one whole minute elapsed: credits 0 and leaves
///   `last_collect` unchanged — the remainder stays collectible.
/// - Otherwise credits `minutes × Σ card_incomes` and advances
///   `last_collect` by exactly `minutes` intervals. With no owned cards
///   the credit is 0 but the timestamp still advances, keeping the
///   semantics uniform.
pub fn accrue_passive_income(
    card_incomes: &[i64],
    coins: i64,
    last_collect: Option<UnixMillis>,
    now: UnixMillis,
) -> IncomeAccrual {
    let Some(last) = last_collect else {
        return IncomeAccrual {
            coins,
            credited: 0,
            last_collect: now,
        };
    };

    let elapsed = now.saturating_millis_since(last);
    let minutes = elapsed / INCOME_INTERVAL_MILLIS;
    if minutes == 0 {
        return IncomeAccrual {
            coins,
            credited: 0,
            last_collect: last,
        };
    }

    let rate: i64 = card_incomes.iter().sum();
    let credited = rate.saturating_mul(minutes as i64);

    IncomeAccrual {
        coins: coins.saturating_add(credited),
        credited,
        last_collect: last + Duration::from_millis(minutes * INCOME_INTERVAL_MILLIS),
    }
}

// =========================================================================
// Tests
// =========================================================================
