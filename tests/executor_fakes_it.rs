// std
use std::{
	collections::VecDeque,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::{Duration, Instant},
};
// self
use rest_executor::{
	CancellationToken, ClientConfig, Error, RequestExecutor,
	auth::{AccessToken, Audience, AuthenticationStrategy, StaticKey},
	cache::TokenCache,
	config::ClientConfigBuilder,
	credential::{CredentialFuture, CredentialSource, TokenRequest},
	decorate::AuthDecorator,
	error::{CredentialError, TransportError},
	http::{HttpTransport, RawResponse, TransportFuture},
	request::{Endpoint, RequestDescriptor},
	url::Url,
};

type Reply = Result<RawResponse, TransportError>;

/// Transport that replays queued replies and answers 200 once the queue drains.
#[derive(Default)]
struct Replay {
	replies: Mutex<VecDeque<Reply>>,
	seen: Mutex<Vec<RequestDescriptor>>,
}
impl Replay {
	fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
		Arc::new(Self { replies: Mutex::new(replies.into_iter().collect()), ..Default::default() })
	}

	fn always(status: u16) -> Arc<Self> {
		Self::new((0..64).map(|_| Ok(RawResponse::new(status, "busy"))))
	}

	fn seen(&self) -> Vec<RequestDescriptor> {
		self.seen.lock().expect("Replay lock should not be poisoned.").clone()
	}
}
impl HttpTransport for Replay {
	fn send<'a>(
		&'a self,
		_endpoint: &'a Endpoint,
		request: &'a RequestDescriptor,
	) -> TransportFuture<'a> {
		self.seen.lock().expect("Replay lock should not be poisoned.").push(request.clone());

		let reply = self
			.replies
			.lock()
			.expect("Replay lock should not be poisoned.")
			.pop_front()
			.unwrap_or_else(|| Ok(RawResponse::new(200, "{}")));

		Box::pin(async move { reply })
	}
}

/// Transport whose sends never complete.
#[derive(Default)]
struct Hanging {
	sends: AtomicUsize,
}
impl HttpTransport for Hanging {
	fn send<'a>(
		&'a self,
		_endpoint: &'a Endpoint,
		_request: &'a RequestDescriptor,
	) -> TransportFuture<'a> {
		self.sends.fetch_add(1, Ordering::SeqCst);

		Box::pin(std::future::pending())
	}
}

/// Credential source that counts acquisitions and takes a little while to answer.
struct SlowSource {
	calls: AtomicUsize,
	delay: Duration,
	lifetime: time::Duration,
	fail: bool,
}
impl SlowSource {
	fn new(delay: Duration) -> Arc<Self> {
		Arc::new(Self {
			calls: AtomicUsize::new(0),
			delay,
			lifetime: time::Duration::hours(1),
			fail: false,
		})
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl CredentialSource for SlowSource {
	fn acquire<'a>(
		&'a self,
		request: TokenRequest<'a>,
		_cancel: &'a CancellationToken,
	) -> CredentialFuture<'a, AccessToken> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

		Box::pin(async move {
			tokio::time::sleep(self.delay).await;

			if self.fail {
				return Err(CredentialError::Rejected { reason: "AADSTS7000215".into() });
			}

			Ok(AccessToken::expiring_in(
				format!("{}-{call}", request.audience),
				time::OffsetDateTime::now_utc(),
				self.lifetime,
			))
		})
	}
}

fn audience() -> Audience {
	Audience::new("api://orders").expect("Audience fixture should be valid.")
}

fn config() -> ClientConfigBuilder {
	let base = Url::parse("https://api.example.com").expect("Base URL fixture should parse.");

	ClientConfig::builder(base).retry_unit(Duration::from_millis(1))
}

fn bearer_executor(transport: Arc<Replay>, source: Arc<SlowSource>) -> RequestExecutor {
	let config = config()
		.authentication(AuthenticationStrategy::BearerFromCredential { audience: audience() })
		.build()
		.expect("Config should validate.");

	RequestExecutor::builder(config)
		.transport(transport)
		.credential_source(source)
		.build()
		.expect("Executor should build.")
}

#[tokio::test]
async fn concurrent_calls_share_one_token_acquisition() {
	let transport = Replay::new([]);
	let source = SlowSource::new(Duration::from_millis(50));
	let executor = bearer_executor(transport.clone(), source.clone());
	let cancel = CancellationToken::new();
	let (a, b, c, d) = tokio::join!(
		executor.get("orders/1", &cancel),
		executor.get("orders/2", &cancel),
		executor.get("orders/3", &cancel),
		executor.get("orders/4", &cancel),
	);

	for result in [a, b, c, d] {
		assert!(result.expect("Call should succeed.").is_success());
	}

	assert_eq!(source.calls(), 1);

	for request in transport.seen() {
		assert_eq!(request.header("Authorization"), Some("Bearer api://orders-1"));
	}
}

#[tokio::test]
async fn tokens_inside_the_buffer_are_refreshed_per_call() {
	let transport = Replay::new([]);
	let source = Arc::new(SlowSource {
		calls: AtomicUsize::new(0),
		delay: Duration::ZERO,
		lifetime: time::Duration::minutes(4),
		fail: false,
	});
	let executor = bearer_executor(transport.clone(), source.clone());
	let cancel = CancellationToken::new();

	executor.get("orders", &cancel).await.expect("First call should succeed.");
	executor.get("orders", &cancel).await.expect("Second call should succeed.");

	let seen = transport.seen();

	assert_eq!(source.calls(), 2);
	assert_eq!(seen[0].header("Authorization"), Some("Bearer api://orders-1"));
	assert_eq!(seen[1].header("Authorization"), Some("Bearer api://orders-2"));
}

#[tokio::test]
async fn authentication_failures_are_not_retried() {
	let transport = Replay::new([]);
	let source = Arc::new(SlowSource {
		calls: AtomicUsize::new(0),
		delay: Duration::ZERO,
		lifetime: time::Duration::hours(1),
		fail: true,
	});
	let executor = bearer_executor(transport.clone(), source.clone());
	let err = executor
		.get("orders", &CancellationToken::new())
		.await
		.expect_err("Rejected credential should fail the call.");

	assert!(matches!(err, Error::Authentication(_)));
	assert_eq!(source.calls(), 1);
	assert!(transport.seen().is_empty());
}

#[tokio::test]
async fn cancellation_interrupts_backoff() {
	let transport = Replay::always(503);
	let config = config()
		.retry_unit(Duration::from_secs(10))
		.build()
		.expect("Config should validate.");
	let executor = RequestExecutor::builder(config)
		.transport(transport.clone())
		.build()
		.expect("Executor should build.");
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();

	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(50)).await;
		trigger.cancel();
	});

	let started = Instant::now();
	let err = executor.get("orders", &cancel).await.expect_err("Canceled call should fail.");

	assert!(err.is_canceled());
	assert!(started.elapsed() < Duration::from_secs(5));
	assert_eq!(transport.seen().len(), 1);
}

#[tokio::test]
async fn canceled_token_prevents_any_send() {
	let transport = Replay::new([]);
	let executor = RequestExecutor::builder(config().build().expect("Config should validate."))
		.transport(transport.clone())
		.build()
		.expect("Executor should build.");
	let cancel = CancellationToken::new();

	cancel.cancel();

	let err = executor.get("orders", &cancel).await.expect_err("Canceled call should fail.");

	assert!(err.is_canceled());
	assert!(transport.seen().is_empty());
}

#[tokio::test]
async fn network_failures_are_retried() {
	let offline = || {
		Err(TransportError::network(std::io::Error::new(
			std::io::ErrorKind::ConnectionRefused,
			"connection refused",
		)))
	};
	let transport = Replay::new([offline(), offline()]);
	let executor = RequestExecutor::builder(config().build().expect("Config should validate."))
		.transport(transport.clone())
		.build()
		.expect("Executor should build.");
	let outcome = executor
		.get("orders", &CancellationToken::new())
		.await
		.expect("Third attempt should succeed.");

	assert!(outcome.is_success());
	assert_eq!(transport.seen().len(), 3);
}

#[tokio::test]
async fn exhausted_network_failures_carry_no_status() {
	let transport = Replay::new((0..3).map(|_| {
		Err(TransportError::network(std::io::Error::from(std::io::ErrorKind::ConnectionReset)))
	}));
	let executor = RequestExecutor::builder(config().build().expect("Config should validate."))
		.transport(transport.clone())
		.build()
		.expect("Executor should build.");
	let err = executor
		.get("orders", &CancellationToken::new())
		.await
		.expect_err("Persistent transport failure should be fatal.");

	match err {
		Error::Fatal(fatal) => {
			assert_eq!(fatal.status, None);
			assert!(fatal.source.is_some());
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert_eq!(transport.seen().len(), 3);
}

#[tokio::test]
async fn unbuildable_requests_fail_on_the_first_attempt() {
	let transport =
		Replay::new([Err(TransportError::Build { message: "bad header name".into() })]);
	let executor = RequestExecutor::builder(config().build().expect("Config should validate."))
		.transport(transport.clone())
		.build()
		.expect("Executor should build.");
	let err = executor
		.get("orders", &CancellationToken::new())
		.await
		.expect_err("Unbuildable request should be fatal.");

	match err {
		Error::Fatal(fatal) => {
			assert_eq!(fatal.status, None);
			assert!(fatal.message.contains("bad header name"));
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert_eq!(transport.seen().len(), 1);
}

#[tokio::test]
async fn resources_outside_the_endpoint_are_never_sent() {
	let transport = Replay::new([]);
	let config = config()
		.path_prefix("v1")
		.authentication(StaticKey::header("sub-key"))
		.build()
		.expect("Config should validate.");
	let executor = RequestExecutor::builder(config)
		.transport(transport.clone())
		.build()
		.expect("Executor should build.");
	let cancel = CancellationToken::new();

	for resource in ["https://evil.example/steal", "../admin/users", "http://[::1"] {
		let err = executor
			.get(resource, &cancel)
			.await
			.expect_err("Escaping resource should be rejected.");

		assert!(matches!(err, Error::InvalidRequest { .. }), "{resource}: {err:?}");
	}

	assert!(transport.seen().is_empty());
}

#[tokio::test]
async fn cancellation_interrupts_an_in_flight_send() {
	let transport = Arc::new(Hanging::default());
	let executor = RequestExecutor::builder(config().build().expect("Config should validate."))
		.transport(transport.clone())
		.build()
		.expect("Executor should build.");
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();

	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(50)).await;
		trigger.cancel();
	});

	let started = Instant::now();
	let err = executor.get("orders", &cancel).await.expect_err("Canceled call should fail.");

	assert!(err.is_canceled());
	assert!(started.elapsed() < Duration::from_secs(5));
	assert_eq!(transport.sends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_interrupts_token_acquisition() {
	let transport = Replay::new([]);
	let source = SlowSource::new(Duration::from_secs(30));
	let executor = bearer_executor(transport.clone(), source.clone());
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();

	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(50)).await;
		trigger.cancel();
	});

	let started = Instant::now();
	let err = executor.get("orders", &cancel).await.expect_err("Canceled call should fail.");

	assert!(err.is_canceled());
	assert!(started.elapsed() < Duration::from_secs(5));
	assert_eq!(source.calls(), 1);
	assert!(transport.seen().is_empty());
	assert!(executor.token_cache().expect("Bearer strategy should own a token cache.").is_empty());
}

#[tokio::test]
async fn extra_decorators_compose_with_the_configured_strategy() {
	let transport = Replay::new([]);
	let source = SlowSource::new(Duration::ZERO);
	let cache = Arc::new(TokenCache::new(source.clone()));
	let bearer = AuthDecorator::new(
		AuthenticationStrategy::BearerFromCredential { audience: audience() },
		Some(cache),
	)
	.expect("Bearer decorator should build.");
	let config = config()
		.authentication(StaticKey::header("sub-key"))
		.build()
		.expect("Config should validate.");
	let executor = RequestExecutor::builder(config)
		.transport(transport.clone())
		.decorator(Arc::new(bearer))
		.build()
		.expect("Executor should build.");

	executor.get("orders", &CancellationToken::new()).await.expect("Call should succeed.");

	let seen = transport.seen();

	assert_eq!(seen[0].header("Ocp-Apim-Subscription-Key"), Some("sub-key"));
	assert_eq!(seen[0].header("Authorization"), Some("Bearer api://orders-1"));
}

#[tokio::test]
async fn shared_cache_serves_several_executors() {
	let source = SlowSource::new(Duration::ZERO);
	let cache = Arc::new(TokenCache::new(source.clone()));
	let cancel = CancellationToken::new();

	for _ in 0..2 {
		let config = config()
			.authentication(AuthenticationStrategy::BearerFromCredential { audience: audience() })
			.build()
			.expect("Config should validate.");
		let executor = RequestExecutor::builder(config)
			.transport(Replay::new([]))
			.token_cache(cache.clone())
			.build()
			.expect("Executor should build.");

		executor.get("orders", &cancel).await.expect("Call should succeed.");
	}

	assert_eq!(source.calls(), 1);
	assert_eq!(cache.metrics().hits(), 1);
}

#[tokio::test]
async fn disabled_fallback_reports_the_rejection() {
	let rejected = RawResponse::new(401, "Access denied due to invalid subscription key.");
	let transport = Replay::new([Ok(rejected)]);
	let config = config()
		.max_attempts(1)
		.authentication(StaticKey::header("primary").with_fallback("secondary"))
		.build()
		.expect("Config should validate.");
	let executor = RequestExecutor::builder(config)
		.transport(transport.clone())
		.legacy_fallback(false)
		.build()
		.expect("Executor should build.");
	let err = executor
		.get("orders", &CancellationToken::new())
		.await
		.expect_err("Rejected key should be fatal.");

	assert_eq!(err.status(), Some(401));
	assert_eq!(transport.seen().len(), 1);
}
