//! Optional observability helpers for executor calls and token acquisition.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to run every call inside a `rest_executor.call` span (fields `method` and
//!   `stage`) and to emit `debug!` events for token cache activity and scheduled retries.
//! - Enable `metrics` to increment `rest_executor_call_total{outcome}` once per finished call and
//!   `rest_executor_token_total{event}` for every token cache event.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Token cache events observed by the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenEvent {
	/// A cached token was still usable.
	Hit,
	/// No usable token was cached; an acquisition follows.
	Miss,
	/// A fresh token was stored.
	Refreshed,
	/// The credential source failed.
	Failed,
}
impl TokenEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenEvent::Hit => "hit",
			TokenEvent::Miss => "miss",
			TokenEvent::Refreshed => "refreshed",
			TokenEvent::Failed => "failed",
		}
	}
}
impl Display for TokenEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Terminal labels recorded once per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Response was in the success set.
	Success,
	/// Resource was absent.
	NotFound,
	/// Service reported field validation failures.
	ValidationError,
	/// Non-retryable failure or exhausted retries.
	FatalError,
	/// Token acquisition failed.
	AuthenticationError,
	/// Call was canceled.
	Canceled,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Success => "success",
			CallOutcome::NotFound => "not_found",
			CallOutcome::ValidationError => "validation_error",
			CallOutcome::FatalError => "fatal_error",
			CallOutcome::AuthenticationError => "authentication_error",
			CallOutcome::Canceled => "canceled",
		}
	}

	/// Maps a finished call onto its label.
	pub fn of(result: &Result<crate::classify::Outcome>) -> Self {
		use crate::classify::Outcome;

		match result {
			Ok(Outcome::Success(_)) => CallOutcome::Success,
			Ok(Outcome::NotFound) => CallOutcome::NotFound,
			Ok(Outcome::ValidationError(_)) => CallOutcome::ValidationError,
			Ok(Outcome::FatalError(_)) => CallOutcome::FatalError,
			Err(Error::Authentication(_)) => CallOutcome::AuthenticationError,
			Err(Error::Canceled) => CallOutcome::Canceled,
			Err(_) => CallOutcome::FatalError,
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
