// self
use crate::obs::{CallOutcome, TokenEvent};

/// Records a finished call via the global metrics recorder (when enabled).
pub fn record_call_outcome(outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("rest_executor_call_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records a token cache event via the global metrics recorder (when enabled).
pub fn record_token_event(event: TokenEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("rest_executor_token_total", "event" => event.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}
