// self
use crate::{
	_prelude::*,
	auth::Audience,
	obs::{CallOutcome, TokenEvent},
	request::Method,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// Span wrapping one executor call.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a span tagged with the HTTP method and call site.
	pub fn new(method: Method, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"rest_executor.call",
				method = method.as_str(),
				stage,
				outcome = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, stage);

			Self {}
		}
	}

	/// Records how the call ended on the span.
	pub fn record_outcome(&self, outcome: CallOutcome) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("outcome", outcome.as_str());
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = outcome;
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event for token cache activity.
pub fn token_event(audience: &Audience, event: TokenEvent) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(audience = %audience, event = event.as_str(), "token cache");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (audience, event);
	}
}

/// Emits a debug event when a retry is scheduled.
pub fn retry_scheduled(attempt: u32, delay: StdDuration, status: Option<u16>) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, ?status, "retry scheduled");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempt, delay, status);
	}
}

/// Emits a debug event when the secondary subscription key is substituted.
pub fn fallback_applied() {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!("primary subscription key rejected; resending with secondary key");
	}
}
