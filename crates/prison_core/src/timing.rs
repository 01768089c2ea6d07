//! Time representation and engine timing constants.
//!
//! The engine never reads a clock. Callers pass the current time as
//! milliseconds since an arbitrary, monotonic epoch of their choosing.

/// Milliseconds since the caller's epoch.
pub type Millis = u64;

/// Quiet period after starting or joining a planet (server anti-spam rule).
pub const JOIN_GRACE_MS: Millis = 3000;

/// Loop cadence while guards fail.
pub const GUARD_RETRY_MS: Millis = 250;

/// Loop cadence while the target queue is empty.
pub const EMPTY_QUEUE_RETRY_MS: Millis = 500;

/// Loop cadence after an attack has been armed.
pub const ARMED_RETRY_MS: Millis = 300;

/// Minimum cooldown after a settled action.
pub const COOLDOWN_BASE_MS: Millis = 5000;

/// Random spread added on top of [`COOLDOWN_BASE_MS`].
pub const COOLDOWN_SPREAD_MS: Millis = 3000;

/// Delay between the disconnect and the reconnect of a reconnect cycle.
pub const RECONNECT_CYCLE_MS: Millis = 120;

/// Server round-trip allowance between sending an action and settling it.
pub const AFTER_ACTION_MS: Millis = 300;

/// Enemy profiles older than this are reset before counting a new hit.
pub const HOSTILITY_WINDOW_MS: Millis = 60_000;
