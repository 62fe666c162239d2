//! Bounded exponential-backoff retry decisions.
//!
//! [`RetryPolicy`] is pure: it decides whether an outcome deserves another attempt and how long
//! to wait first. [`RetryState`] is the per-call cursor the executor advances; it is created
//! and discarded within one top-level invocation.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	classify::Outcome,
	error::{FatalError, TransportError},
};

/// Attempt budget used when none (or a non-positive one) is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Base unit multiplied by `2^attempt`.
pub const DEFAULT_RETRY_UNIT: StdDuration = StdDuration::from_secs(1);

/// Retry decisions and backoff timing for one client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	max_attempts: u32,
	unit: StdDuration,
	jitter: bool,
}
impl RetryPolicy {
	/// Creates a policy allowing `max_attempts` sends in total (0 selects the default).
	pub fn new(max_attempts: u32) -> Self {
		let max_attempts = if max_attempts == 0 { DEFAULT_MAX_ATTEMPTS } else { max_attempts };

		Self { max_attempts, unit: DEFAULT_RETRY_UNIT, jitter: false }
	}

	/// Creates a policy from a possibly absent or non-positive configured value.
	pub fn from_configured(max_attempts: Option<i32>) -> Self {
		let max_attempts = max_attempts.and_then(|value| u32::try_from(value).ok()).unwrap_or(0);

		Self::new(max_attempts)
	}

	/// Overrides the backoff unit (`delay = unit * 2^attempt`).
	pub fn with_unit(mut self, unit: StdDuration) -> Self {
		self.unit = unit;

		self
	}

	/// Enables additive jitter in `[0, unit)` on top of the exponential delay.
	pub fn with_jitter(mut self, jitter: bool) -> Self {
		self.jitter = jitter;

		self
	}

	/// Total number of sends allowed for one call.
	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// Returns `true` when `outcome` is retryable and `attempt` sends leave budget for another.
	pub fn should_retry(&self, outcome: &Outcome, attempt: u32) -> bool {
		match outcome {
			Outcome::FatalError(err) => attempt < self.max_attempts && is_transient(err),
			Outcome::Success(_) | Outcome::NotFound | Outcome::ValidationError(_) => false,
		}
	}

	/// Exponential delay before the send that follows `attempt`, without jitter.
	pub fn base_delay(&self, attempt: u32) -> StdDuration {
		self.unit.saturating_mul(2_u32.saturating_pow(attempt))
	}

	/// Delay before the send that follows `attempt`, including jitter when enabled.
	pub fn delay_for(&self, attempt: u32) -> StdDuration {
		let base = self.base_delay(attempt);

		if !self.jitter || self.unit.is_zero() {
			return base;
		}

		let unit_nanos = u64::try_from(self.unit.as_nanos()).unwrap_or(u64::MAX);
		let extra = rand::rng().random_range(0..unit_nanos);

		base.saturating_add(StdDuration::from_nanos(extra))
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_ATTEMPTS)
	}
}

/// Returns `true` for failures worth another attempt: no response, 408, 429, and anything
/// outside the 4xx range. Other 4xx statuses are terminal, as are requests the transport could
/// not build.
pub fn is_transient(err: &FatalError) -> bool {
	match err.status {
		None => !is_build_failure(err),
		Some(408 | 429) => true,
		Some(400..=499) => false,
		Some(_) => true,
	}
}

fn is_build_failure(err: &FatalError) -> bool {
	matches!(
		err.source.as_deref().and_then(|source| source.downcast_ref::<TransportError>()),
		Some(TransportError::Build { .. })
	)
}

/// Per-call retry cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryState {
	/// 1-based index of the send in flight.
	pub attempt: u32,
	/// Label of the last classified outcome.
	pub last_outcome: Option<&'static str>,
	/// Delay scheduled before the next send.
	pub next_delay: Option<StdDuration>,
}
impl RetryState {
	/// State before the first send.
	pub fn new() -> Self {
		Self { attempt: 1, last_outcome: None, next_delay: None }
	}

	/// Records `outcome` and, when `policy` allows another send, advances the attempt counter
	/// and returns the delay to wait first.
	pub fn advance(&mut self, policy: &RetryPolicy, outcome: &Outcome) -> Option<StdDuration> {
		self.last_outcome = Some(outcome.as_str());

		if !policy.should_retry(outcome, self.attempt) {
			self.next_delay = None;

			return None;
		}

		let delay = policy.delay_for(self.attempt);

		self.attempt += 1;
		self.next_delay = Some(delay);

		Some(delay)
	}
}
impl Default for RetryState {
	fn default() -> Self {
		Self::new()
	}
}
