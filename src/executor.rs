//! Authenticated, retried, and classified request execution.
//!
//! [`RequestExecutor`] turns a [`RequestDescriptor`] into a terminal [`Outcome`]. Every attempt
//! starts from a fresh copy of the caller's descriptor, runs the registered decorators (the
//! authentication decorator first), sends through the [`HttpTransport`], and classifies the
//! response. Retryable fatal outcomes wait out an exponential backoff and resend until the
//! attempt budget is spent.
//!
//! Terminal results map as follows:
//!
//! - success, not-found, and validation outcomes return `Ok`;
//! - a fatal outcome (non-retryable, or retries exhausted) returns [`Error::Fatal`];
//! - credential failures return [`Error::Authentication`] without retrying;
//! - cancellation at any suspension point returns [`Error::Canceled`] without retrying.
//!
//! The legacy secondary subscription key, when configured, is tried once after the gateway
//! rejects the primary key. The resend happens within the same attempt and does not consume
//! retry budget; later attempts of the same call keep using the secondary key.

// crates.io
use serde::de::DeserializeOwned;
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	auth::AuthenticationStrategy,
	cache::TokenCache,
	cancel,
	classify::{Outcome, ResponseClassifier},
	config::ClientConfig,
	credential::{ClientSecretCredential, CredentialSource, EnvironmentCredential},
	decorate::{AuthDecorator, RequestDecorator},
	error::{ConfigError, TransportError},
	fallback::SecondaryKeyFallback,
	http::{HttpTransport, RawResponse},
	obs::{self, CallOutcome, CallSpan},
	request::{Endpoint, Method, RequestDescriptor},
	retry::{RetryPolicy, RetryState},
};

/// Executes requests against one configured API.
///
/// Executors are cheap to share behind an [`Arc`]; all per-call state lives on the stack of
/// [`RequestExecutor::execute`]. The token cache and transport may be shared across executors.
pub struct RequestExecutor {
	endpoint: Endpoint,
	transport: Arc<dyn HttpTransport>,
	decorators: Vec<Arc<dyn RequestDecorator>>,
	classifier: ResponseClassifier,
	policy: RetryPolicy,
	fallback: Option<SecondaryKeyFallback>,
	token_cache: Option<Arc<TokenCache>>,
}
impl RequestExecutor {
	/// Starts a builder for `config`.
	pub fn builder(config: ClientConfig) -> RequestExecutorBuilder {
		RequestExecutorBuilder::new(config)
	}

	/// Builds an executor with default collaborators for `config`.
	pub fn new(config: ClientConfig) -> Result<Self> {
		Self::builder(config).build()
	}

	/// Root every resource resolves against.
	pub fn endpoint(&self) -> &Endpoint {
		&self.endpoint
	}

	/// Retry policy in effect.
	pub fn retry_policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Token cache backing bearer authentication, if any.
	pub fn token_cache(&self) -> Option<&Arc<TokenCache>> {
		self.token_cache.as_ref()
	}

	/// Executes `request` until it reaches a terminal outcome.
	///
	/// # Errors
	///
	/// - [`Error::InvalidRequest`] for an empty resource path or one that resolves outside the
	///   endpoint root.
	/// - [`Error::Authentication`] when a bearer token cannot be acquired.
	/// - [`Error::Fatal`] for non-retryable failures and exhausted retries.
	/// - [`Error::Canceled`] when `cancel` fires.
	pub async fn execute(
		&self,
		request: RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<Outcome> {
		let span = CallSpan::new(request.method, "execute");
		let result = span.instrument(self.run(request, cancel)).await;
		let outcome = CallOutcome::of(&result);

		span.record_outcome(outcome);
		obs::record_call_outcome(outcome);

		result
	}

	/// Issues `GET resource`.
	pub async fn get(&self, resource: &str, cancel: &CancellationToken) -> Result<Outcome> {
		self.execute(RequestDescriptor::new(Method::Get, resource), cancel).await
	}

	/// Issues `GET resource` and decodes a successful body; absence yields `None`.
	pub async fn get_json<T>(&self, resource: &str, cancel: &CancellationToken) -> Result<Option<T>>
	where
		T: DeserializeOwned,
	{
		self.get(resource, cancel).await?.into_json()
	}

	/// Issues `HEAD resource`.
	pub async fn head(&self, resource: &str, cancel: &CancellationToken) -> Result<Outcome> {
		self.execute(RequestDescriptor::new(Method::Head, resource), cancel).await
	}

	/// Issues `DELETE resource`.
	pub async fn delete(&self, resource: &str, cancel: &CancellationToken) -> Result<Outcome> {
		self.execute(RequestDescriptor::new(Method::Delete, resource), cancel).await
	}

	/// Issues `POST resource` with a JSON body.
	pub async fn post_json<T>(
		&self,
		resource: &str,
		body: &T,
		cancel: &CancellationToken,
	) -> Result<Outcome>
	where
		T: ?Sized + Serialize,
	{
		self.execute(RequestDescriptor::new(Method::Post, resource).with_json(body)?, cancel).await
	}

	/// Issues `PUT resource` with a JSON body.
	pub async fn put_json<T>(
		&self,
		resource: &str,
		body: &T,
		cancel: &CancellationToken,
	) -> Result<Outcome>
	where
		T: ?Sized + Serialize,
	{
		self.execute(RequestDescriptor::new(Method::Put, resource).with_json(body)?, cancel).await
	}

	/// Issues `PATCH resource` with a JSON body.
	pub async fn patch_json<T>(
		&self,
		resource: &str,
		body: &T,
		cancel: &CancellationToken,
	) -> Result<Outcome>
	where
		T: ?Sized + Serialize,
	{
		self.execute(RequestDescriptor::new(Method::Patch, resource).with_json(body)?, cancel).await
	}

	async fn run(&self, request: RequestDescriptor, cancel: &CancellationToken) -> Result<Outcome> {
		if request.resource.trim().is_empty() {
			return Err(Error::InvalidRequest { reason: "resource path is empty".into() });
		}

		self.endpoint.url_for(&request.resource, &request.query)?;

		let mut state = RetryState::new();
		let mut secondary_key = false;

		loop {
			if cancel.is_cancelled() {
				return Err(Error::Canceled);
			}

			let mut attempt = request.clone();

			self.decorate(&mut attempt, cancel).await?;

			if let Some(fallback) = self.fallback.as_ref().filter(|_| secondary_key) {
				fallback.substitute(&mut attempt);
			}

			let mut received = self.send(&attempt, cancel).await?;
			let rejected_primary = match (&self.fallback, &received) {
				(Some(fallback), Ok(response)) => !secondary_key && fallback.applies_to(response),
				_ => false,
			};

			if let Some(fallback) = self.fallback.as_ref().filter(|_| rejected_primary) {
				secondary_key = true;

				fallback.substitute(&mut attempt);
				obs::fallback_applied();

				received = self.send(&attempt, cancel).await?;
			}

			let outcome = match received {
				Ok(response) => self.classifier.classify(request.method, response),
				Err(err) => self.classifier.classify_transport_error(err),
			};
			let status = match &outcome {
				Outcome::FatalError(err) => err.status,
				_ => None,
			};

			match state.advance(&self.policy, &outcome) {
				Some(delay) => {
					obs::retry_scheduled(state.attempt - 1, delay, status);
					cancel::sleep(delay, cancel).await?;
				},
				None =>
					return match outcome {
						Outcome::FatalError(err) => Err(err.into()),
						terminal => Ok(terminal),
					},
			}
		}
	}

	async fn decorate(
		&self,
		request: &mut RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<()> {
		for decorator in &self.decorators {
			cancel::or_cancel(decorator.decorate(request, cancel), cancel).await??;
		}

		Ok(())
	}

	async fn send(
		&self,
		request: &RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<Result<RawResponse, TransportError>> {
		cancel::or_cancel(self.transport.send(&self.endpoint, request), cancel).await
	}
}
impl Debug for RequestExecutor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor")
			.field("endpoint", &self.endpoint)
			.field("decorators", &self.decorators.len())
			.field("classifier", &self.classifier)
			.field("policy", &self.policy)
			.field("fallback", &self.fallback.is_some())
			.field("token_cache", &self.token_cache)
			.finish()
	}
}

/// Builder for [`RequestExecutor`] values.
///
/// Collaborators not supplied explicitly are derived from the configuration:
///
/// - the transport defaults to a pooled reqwest client (feature `reqwest`);
/// - bearer strategies get a [`TokenCache`] over the injected credential source, a
///   [`ClientSecretCredential`] for the client-secret strategy, or an [`EnvironmentCredential`];
/// - static keys with a secondary value get the legacy [`SecondaryKeyFallback`].
///
/// Derived collaborators belong to the executor being built and are not shared. Executors that
/// target the same hosts or audiences should be handed one process-lifetime transport through
/// [`RequestExecutorBuilder::transport`] and one cache through
/// [`RequestExecutorBuilder::token_cache`], so connections are pooled once per endpoint and
/// tokens are acquired once per audience.
pub struct RequestExecutorBuilder {
	config: ClientConfig,
	transport: Option<Arc<dyn HttpTransport>>,
	credential_source: Option<Arc<dyn CredentialSource>>,
	token_cache: Option<Arc<TokenCache>>,
	decorators: Vec<Arc<dyn RequestDecorator>>,
	legacy_fallback: bool,
	fallback_marker: Option<String>,
}
impl RequestExecutorBuilder {
	/// Creates a builder for `config`.
	pub fn new(config: ClientConfig) -> Self {
		Self {
			config,
			transport: None,
			credential_source: None,
			token_cache: None,
			decorators: Vec::new(),
			legacy_fallback: true,
			fallback_marker: None,
		}
	}

	/// Uses `transport` instead of the default reqwest transport.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Uses `source` for bearer strategies instead of the derived credential.
	pub fn credential_source(mut self, source: Arc<dyn CredentialSource>) -> Self {
		self.credential_source = Some(source);

		self
	}

	/// Shares an existing token cache; it takes precedence over any credential source.
	pub fn token_cache(mut self, cache: Arc<TokenCache>) -> Self {
		self.token_cache = Some(cache);

		self
	}

	/// Registers a decorator that runs after authentication on every attempt.
	pub fn decorator(mut self, decorator: Arc<dyn RequestDecorator>) -> Self {
		self.decorators.push(decorator);

		self
	}

	/// Enables or disables the secondary subscription-key fallback (enabled by default).
	pub fn legacy_fallback(mut self, enabled: bool) -> Self {
		self.legacy_fallback = enabled;

		self
	}

	/// Overrides the response body fragment that triggers the secondary-key fallback.
	pub fn fallback_marker(mut self, marker: impl Into<String>) -> Self {
		self.fallback_marker = Some(marker.into());

		self
	}

	/// Validates the configuration and assembles the executor.
	pub fn build(self) -> Result<RequestExecutor> {
		self.config.validate()?;

		let endpoint = self.config.endpoint()?;
		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport(&self.config)?,
		};
		let token_cache = match (self.token_cache, self.config.authentication.audience()) {
			(Some(cache), Some(_)) => Some(cache),
			(None, Some(audience)) => {
				let source = match self.credential_source {
					Some(source) => source,
					None => derive_source(&self.config.authentication, audience, &transport)?,
				};

				Some(Arc::new(
					TokenCache::new(source).with_buffer(self.config.token_buffer_window()),
				))
			},
			(_, None) => None,
		};
		let auth = AuthDecorator::new(self.config.authentication.clone(), token_cache.clone())?;
		let fallback = match &self.config.authentication {
			AuthenticationStrategy::StaticKey(key) if self.legacy_fallback =>
				SecondaryKeyFallback::from_static_key(key).map(|fallback| match self.fallback_marker {
					Some(marker) => fallback.with_marker(marker),
					None => fallback,
				}),
			_ => None,
		};
		let mut decorators: Vec<Arc<dyn RequestDecorator>> = vec![Arc::new(auth)];

		decorators.extend(self.decorators);

		Ok(RequestExecutor {
			endpoint,
			transport,
			decorators,
			classifier: self.config.classifier(),
			policy: self.config.retry_policy(),
			fallback,
			token_cache,
		})
	}
}
impl Debug for RequestExecutorBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutorBuilder")
			.field("config", &self.config)
			.field("transport_set", &self.transport.is_some())
			.field("credential_source_set", &self.credential_source.is_some())
			.field("token_cache_set", &self.token_cache.is_some())
			.field("decorators", &self.decorators.len())
			.field("legacy_fallback", &self.legacy_fallback)
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport(config: &ClientConfig) -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Ok(Arc::new(ReqwestTransport::new(config.request_timeout_duration())))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport(_config: &ClientConfig) -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Err(ConfigError::MissingTransport)
}

fn derive_source(
	strategy: &AuthenticationStrategy,
	audience: &crate::auth::Audience,
	transport: &Arc<dyn HttpTransport>,
) -> Result<Arc<dyn CredentialSource>, ConfigError> {
	match strategy {
		AuthenticationStrategy::ClientSecretCredential { tenant_id, client_id, secret, .. } =>
			Ok(Arc::new(ClientSecretCredential::new(
				tenant_id.clone(),
				client_id.clone(),
				secret.clone(),
				transport.clone(),
			)?)),
		_ => match EnvironmentCredential::from_env(transport.clone()) {
			Ok(credential) => Ok(Arc::new(credential)),
			Err(ConfigError::MissingEnvironment { .. }) =>
				Err(ConfigError::MissingCredentialSource { audience: audience.to_string() }),
			Err(err) => Err(err),
		},
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::VecDeque;
	// self
	use super::*;
	use crate::{auth::StaticKey, config::ClientConfigBuilder, http::TransportFuture};

	struct Scripted {
		replies: Mutex<VecDeque<RawResponse>>,
		seen: Mutex<Vec<RequestDescriptor>>,
	}
	impl Scripted {
		fn new(replies: impl IntoIterator<Item = RawResponse>) -> Arc<Self> {
			Arc::new(Self {
				replies: Mutex::new(replies.into_iter().collect()),
				seen: Default::default(),
			})
		}
	}
	impl HttpTransport for Scripted {
		fn send<'a>(
			&'a self,
			_endpoint: &'a Endpoint,
			request: &'a RequestDescriptor,
		) -> TransportFuture<'a> {
			self.seen.lock().push(request.clone());

			let reply = self.replies.lock().pop_front().unwrap_or_else(|| RawResponse::new(500, ""));

			Box::pin(async move { Ok(reply) })
		}
	}

	fn executor(
		transport: Arc<Scripted>,
		configure: impl FnOnce(ClientConfigBuilder) -> ClientConfigBuilder,
	) -> RequestExecutor {
		let base = Url::parse("https://api.example.com").expect("Base URL fixture should parse.");
		let config = configure(ClientConfig::builder(base).retry_unit(StdDuration::from_millis(1)))
			.build()
			.expect("Config fixture should validate.");

		RequestExecutor::builder(config)
			.transport(transport)
			.build()
			.expect("Executor fixture should build.")
	}

	#[tokio::test]
	async fn empty_resource_is_rejected_before_sending() {
		let transport = Scripted::new([]);
		let executor = executor(transport.clone(), |c| c);
		let err = executor
			.get(" ", &CancellationToken::new())
			.await
			.expect_err("Empty resource should be rejected.");

		assert!(matches!(err, Error::InvalidRequest { .. }));
		assert!(transport.seen.lock().is_empty());
	}

	#[tokio::test]
	async fn transient_failures_retry_then_succeed() {
		let transport = Scripted::new([
			RawResponse::new(503, "busy"),
			RawResponse::new(502, "gateway"),
			RawResponse::new(200, r#"{"ok":true}"#),
		]);
		let executor = executor(transport.clone(), |c| c);
		let outcome = executor
			.get("orders", &CancellationToken::new())
			.await
			.expect("Third attempt should win.");

		assert!(outcome.is_success());
		assert_eq!(transport.seen.lock().len(), 3);
	}

	#[tokio::test]
	async fn exhausted_retries_surface_last_fatal_error() {
		let transport = Scripted::new([
			RawResponse::new(500, "a"),
			RawResponse::new(500, "b"),
			RawResponse::new(500, "c"),
			RawResponse::new(200, ""),
		]);
		let executor = executor(transport.clone(), |c| c.max_attempts(2));
		let err = executor
			.get("orders", &CancellationToken::new())
			.await
			.expect_err("Retries should be exhausted.");

		assert_eq!(err.status(), Some(500));
		assert!(err.to_string().ends_with(": b"));
		assert_eq!(transport.seen.lock().len(), 2);
	}

	#[tokio::test]
	async fn terminal_outcomes_are_not_retried() {
		let transport = Scripted::new([
			RawResponse::new(404, ""),
			RawResponse::new(422, r#"{"errors":{"qty":["must be positive"]}}"#),
			RawResponse::new(403, "forbidden"),
		]);
		let executor = executor(transport.clone(), |c| c);
		let cancel = CancellationToken::new();

		assert!(executor.get("a", &cancel).await.expect("404 is an outcome.").is_not_found());
		assert!(
			executor
				.post_json("b", &serde_json::json!({ "qty": 0 }), &cancel)
				.await
				.expect("422 is an outcome.")
				.field_errors()
				.is_some()
		);
		let err = executor.delete("c", &cancel).await.expect_err("403 is fatal.");

		assert_eq!(err.status(), Some(403));
		assert_eq!(transport.seen.lock().len(), 3);
	}

	#[tokio::test]
	async fn secondary_key_is_tried_once_without_consuming_budget() {
		let rejected = RawResponse::new(401, "Access denied due to invalid subscription key.");
		let transport = Scripted::new([rejected.clone(), RawResponse::new(204, "")]);
		let executor = executor(transport.clone(), |c| {
			c.max_attempts(1).authentication(StaticKey::header("primary").with_fallback("secondary"))
		});
		let outcome = executor
			.delete("orders/1", &CancellationToken::new())
			.await
			.expect("Secondary key should succeed.");

		assert!(outcome.is_success());

		let seen = transport.seen.lock();

		assert_eq!(seen.len(), 2);
		assert_eq!(seen[0].header("Ocp-Apim-Subscription-Key"), Some("primary"));
		assert_eq!(seen[1].header("Ocp-Apim-Subscription-Key"), Some("secondary"));
	}

	#[tokio::test]
	async fn secondary_key_rejection_is_fatal() {
		let rejected = RawResponse::new(401, "Access denied due to invalid subscription key.");
		let transport = Scripted::new([rejected.clone(), rejected]);
		let executor = executor(transport.clone(), |c| {
			c.authentication(StaticKey::header("primary").with_fallback("secondary"))
		});
		let err = executor
			.get("orders", &CancellationToken::new())
			.await
			.expect_err("Both keys rejected should be fatal.");

		assert_eq!(err.status(), Some(401));
		assert_eq!(transport.seen.lock().len(), 2);
	}

	#[test]
	fn client_secret_strategy_derives_its_own_source() {
		let base = Url::parse("https://api.example.com").expect("Base URL fixture should parse.");
		let config = ClientConfig::builder(base)
			.authentication(AuthenticationStrategy::ClientSecretCredential {
				audience: crate::auth::Audience::new("api://x").expect("Audience is valid."),
				tenant_id: crate::auth::TenantId::new("t").expect("Tenant is valid."),
				client_id: crate::auth::ClientId::new("c").expect("Client is valid."),
				secret: "s".into(),
			})
			.build()
			.expect("Config fixture should validate.");
		let executor = RequestExecutor::builder(config)
			.transport(Scripted::new([]))
			.build()
			.expect("Client-secret strategy derives its own source.");

		assert!(executor.token_cache().is_some());
	}
}
