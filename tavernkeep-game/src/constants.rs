//! Centralized balance and tuning constants for Tavernkeep inn logic.
//!
//! These values define the deterministic math for the core simulation.
//! Keeping them together ensures that gameplay can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! JSON assets.

// Shift timing. Public: the external tick source schedules around these.
pub const WORK_DURATION_MS: u64 = 25 * 60 * 1_000;
pub const SHORT_BREAK_MS: u64 = 5 * 60 * 1_000;
pub const LONG_BREAK_MS: u64 = 15 * 60 * 1_000;
pub const LONG_BREAK_CYCLE: u32 = 4;

// Tick lock ----------------------------------------------------------------
pub(crate) const LOCK_TIMEOUT_MS: u64 = 30_000;
pub(crate) const LOCK_RETRY_ATTEMPTS: u32 = 3;
pub(crate) const LOCK_RETRY_DELAY_MS: u64 = 5;

// Patron arrivals ----------------------------------------------------------
pub(crate) const REPUTATION_MIDPOINT: i32 = 50;
pub(crate) const HAPPINESS_SEED_MIN: i32 = 30;
pub(crate) const HAPPINESS_SEED_MAX: i32 = 70;

// Ordering -----------------------------------------------------------------
pub(crate) const ORDER_SPACING_MS: u64 = 60_000;

// Departures ---------------------------------------------------------------
pub(crate) const STORM_OUT_THRESHOLD: i32 = 20;
pub(crate) const HAPPY_DEPARTURE_MIN: i32 = 50;
pub(crate) const DEPARTURE_REPUTATION_GAIN: i32 = 1;
pub(crate) const STORM_OUT_BASE_PENALTY: i32 = 1;
pub(crate) const STORM_OUT_PENALTY_DIVISOR: i32 = 5;
pub(crate) const MAX_VISIT_MS: u64 = 90 * 60_000;

// Overnight stays ----------------------------------------------------------
pub(crate) const OVERNIGHT_MIN_HAPPINESS: i32 = 60;
pub(crate) const OVERNIGHT_STAY_CHANCE: f32 = 0.5;
pub(crate) const OVERNIGHT_HAPPINESS_GAIN: i32 = 5;

// Service ------------------------------------------------------------------
pub(crate) const SERVICE_FAST_RATIO: f32 = 0.8;
pub(crate) const SERVICE_SLOW_RATIO: f32 = 1.5;
pub(crate) const FAST_HAPPINESS_DELTA: i32 = 5;
pub(crate) const ON_TIME_HAPPINESS_DELTA: i32 = 1;
pub(crate) const SLOW_HAPPINESS_DELTA: i32 = -3;
pub(crate) const CAPACITY_SPEED_DIVISOR: i32 = 20;
pub(crate) const CAPACITY_PERCEPTION_DIVISOR: i32 = 25;

// Payroll ------------------------------------------------------------------
pub(crate) const STAT_BONUS_PER_POINT: f64 = 0.005;
pub(crate) const STAT_BONUS_CAP: f64 = 0.25;
pub(crate) const SETTLEMENT_XP: u32 = 5;
pub(crate) const XP_PER_LEVEL: u32 = 100;
pub(crate) const WAGE_STEP_PER_LEVEL: i64 = 2;

// Event log ----------------------------------------------------------------
pub(crate) const MAX_EVENT_LOG: usize = 64;
