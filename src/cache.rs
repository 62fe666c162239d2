//! Audience-keyed bearer token cache with expiry buffering and single-flight acquisition.
//!
//! [`TokenCache::get_token`] serves a cached token while `now < expires_on - buffer`. On a miss
//! the caller takes the audience's single-flight guard, re-checks the cache, and only then asks
//! the [`CredentialSource`] for a token scoped to `{audience}/.default`. Concurrent callers that
//! miss together queue on the guard and pick up the token the first one stored, so each expiry
//! cycle costs one credential round-trip per audience.
//!
//! Tokens are stored with their true expiry; the buffer is applied only at lookup time.

mod metrics;

pub use metrics::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Audience},
	cancel,
	credential::{CredentialSource, TokenRequest},
	error::AuthenticationError,
	obs::{self, TokenEvent},
};

/// Safety margin subtracted from a token's expiry when none is configured.
pub const DEFAULT_TOKEN_BUFFER: Duration = Duration::minutes(5);

/// Process-wide token cache shared by every executor that targets the same credential source.
pub struct TokenCache {
	source: Arc<dyn CredentialSource>,
	buffer: Duration,
	tokens: RwLock<HashMap<Audience, AccessToken>>,
	guards: Mutex<HashMap<Audience, Arc<AsyncMutex<()>>>>,
	metrics: Arc<TokenCacheMetrics>,
}
impl TokenCache {
	/// Creates an empty cache over `source` with the default buffer.
	pub fn new(source: Arc<dyn CredentialSource>) -> Self {
		Self {
			source,
			buffer: DEFAULT_TOKEN_BUFFER,
			tokens: Default::default(),
			guards: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Overrides the expiry buffer; negative values clamp to zero.
	pub fn with_buffer(mut self, buffer: Duration) -> Self {
		self.buffer = if buffer.is_negative() { Duration::ZERO } else { buffer };

		self
	}

	/// Expiry buffer applied at lookup time.
	pub fn buffer(&self) -> Duration {
		self.buffer
	}

	/// Shared counters for cache traffic.
	pub fn metrics(&self) -> Arc<TokenCacheMetrics> {
		self.metrics.clone()
	}

	/// Returns a token for `audience` that is usable now, acquiring one when needed.
	///
	/// # Errors
	///
	/// - [`Error::Authentication`] when the credential source fails; the failure carries the
	///   audience and the source's cause and is never cached.
	/// - [`Error::Canceled`] when `cancel` fires while waiting on the guard or the source.
	pub async fn get_token(
		&self,
		audience: &Audience,
		cancel: &CancellationToken,
	) -> Result<AccessToken> {
		if cancel.is_cancelled() {
			return Err(Error::Canceled);
		}
		if let Some(token) = self.lookup(audience) {
			return Ok(token);
		}

		let guard = self.guard(audience);
		let _singleflight = cancel::or_cancel(guard.lock(), cancel).await?;

		// Another caller may have refreshed while this one waited on the guard.
		if let Some(token) = self.lookup(audience) {
			return Ok(token);
		}

		obs::token_event(audience, TokenEvent::Miss);
		obs::record_token_event(TokenEvent::Miss);
		self.metrics.record_acquisition();

		let scope = audience.default_scope();
		let request = TokenRequest { audience, scope: &scope };

		match cancel::or_cancel(self.source.acquire(request, cancel), cancel).await? {
			Ok(token) => {
				self.tokens.write().insert(audience.clone(), token.clone());
				obs::token_event(audience, TokenEvent::Refreshed);
				obs::record_token_event(TokenEvent::Refreshed);

				Ok(token)
			},
			Err(source) => {
				self.metrics.record_failure();
				obs::token_event(audience, TokenEvent::Failed);
				obs::record_token_event(TokenEvent::Failed);

				Err(AuthenticationError { audience: audience.clone(), source }.into())
			},
		}
	}

	/// Drops the cached token for `audience`, returning it if present.
	pub fn invalidate(&self, audience: &Audience) -> Option<AccessToken> {
		self.tokens.write().remove(audience)
	}

	/// Number of audiences with a cached token (usable or not).
	pub fn len(&self) -> usize {
		self.tokens.read().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.tokens.read().is_empty()
	}

	fn lookup(&self, audience: &Audience) -> Option<AccessToken> {
		let now = OffsetDateTime::now_utc();
		let token = self
			.tokens
			.read()
			.get(audience)
			.filter(|token| token.is_usable_at(now, self.buffer))
			.cloned()?;

		self.metrics.record_hit();
		obs::token_event(audience, TokenEvent::Hit);
		obs::record_token_event(TokenEvent::Hit);

		Some(token)
	}

	fn guard(&self, audience: &Audience) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(audience.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("buffer", &self.buffer)
			.field("audiences", &self.len())
			.finish()
	}
}
