//! Cooperative cancellation helpers shared by the cache, credentials, and executor.
//!
//! Every suspension point (token acquisition, HTTP send, backoff sleep) is raced against a
//! [`CancellationToken`]; the losing future is dropped so a canceled call returns promptly.

pub use tokio_util::sync::CancellationToken;

// self
use crate::_prelude::*;

/// Races `fut` against `cancel`, yielding [`Error::Canceled`] when the token fires first.
///
/// A token that is already canceled wins without polling `fut`.
pub async fn or_cancel<F>(fut: F, cancel: &CancellationToken) -> Result<F::Output>
where
	F: Future,
{
	tokio::select! {
		biased;

		_ = cancel.cancelled() => Err(Error::Canceled),
		output = fut => Ok(output),
	}
}

/// Sleeps for `delay` unless `cancel` fires first.
pub async fn sleep(delay: StdDuration, cancel: &CancellationToken) -> Result<()> {
	if delay.is_zero() {
		return if cancel.is_cancelled() { Err(Error::Canceled) } else { Ok(()) };
	}

	or_cancel(tokio::time::sleep(delay), cancel).await
}
