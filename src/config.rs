//! Client configuration and its validating builder.
//!
//! [`ClientConfig`] is plain serde data so it can be loaded from any configuration format. Every
//! executor validates it once at construction; the derived helpers ([`ClientConfig::endpoint`],
//! [`ClientConfig::retry_policy`], and friends) never fail afterwards.

// std
use std::iter::IntoIterator;
// self
use crate::{
	_prelude::*,
	auth::AuthenticationStrategy,
	classify::{DEFAULT_SUCCESS_STATUSES, ResponseClassifier},
	error::ConfigError,
	request::Endpoint,
	retry::RetryPolicy,
};

const DEFAULT_TOKEN_BUFFER_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 100;
const DEFAULT_RETRY_UNIT_MS: u64 = 1_000;

/// Settings for one API client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Absolute http(s) base URL without query or fragment.
	pub base_url: Url,
	/// Optional path segment inserted between the base URL and every resource.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path_prefix: Option<String>,
	/// Total sends per call; absent or non-positive selects 3.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_attempts: Option<i32>,
	/// Authentication applied to every request.
	#[serde(default)]
	pub authentication: AuthenticationStrategy,
	/// Seconds subtracted from a token's expiry before it is considered stale.
	#[serde(default = "default_token_buffer")]
	pub token_buffer: u64,
	/// Per-request transport timeout in seconds.
	#[serde(default = "default_request_timeout")]
	pub request_timeout: u64,
	/// Statuses classified as success.
	#[serde(default = "default_success_statuses")]
	pub success_statuses: Vec<u16>,
	/// Backoff unit in milliseconds; the delay before send `n + 1` is `unit * 2^n`.
	#[serde(default = "default_retry_unit")]
	pub retry_unit: u64,
	/// Adds up to one unit of random delay to every backoff.
	#[serde(default)]
	pub jitter: bool,
}
impl ClientConfig {
	/// Starts a builder for `base_url`.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Checks every invariant the executor relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.endpoint()?;

		let blank_key = matches!(
			&self.authentication,
			AuthenticationStrategy::StaticKey(key) if key.name.trim().is_empty()
		);

		if blank_key {
			return Err(ConfigError::MissingKeyName);
		}
		if let Some(status) =
			self.success_statuses.iter().copied().find(|status| !(100..=599).contains(status))
		{
			return Err(ConfigError::InvalidSuccessStatus { status });
		}

		Ok(())
	}

	/// Root every resource path resolves against.
	pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
		Endpoint::new(&self.base_url, self.path_prefix.as_deref())
	}

	/// Retry policy derived from the attempt budget, unit, and jitter settings.
	pub fn retry_policy(&self) -> RetryPolicy {
		RetryPolicy::from_configured(self.max_attempts)
			.with_unit(StdDuration::from_millis(self.retry_unit))
			.with_jitter(self.jitter)
	}

	/// Classifier for the configured success set (the default set when empty).
	pub fn classifier(&self) -> ResponseClassifier {
		if self.success_statuses.is_empty() {
			ResponseClassifier::default()
		} else {
			ResponseClassifier::new(self.success_statuses.iter().copied())
		}
	}

	/// Token expiry buffer as a signed duration.
	pub fn token_buffer_window(&self) -> Duration {
		Duration::seconds(i64::try_from(self.token_buffer).unwrap_or(i64::MAX))
	}

	/// Per-request transport timeout.
	pub fn request_timeout_duration(&self) -> StdDuration {
		StdDuration::from_secs(self.request_timeout)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	config: ClientConfig,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with defaults for `base_url`.
	pub fn new(base_url: Url) -> Self {
		Self {
			config: ClientConfig {
				base_url,
				path_prefix: None,
				max_attempts: None,
				authentication: AuthenticationStrategy::None,
				token_buffer: DEFAULT_TOKEN_BUFFER_SECS,
				request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
				success_statuses: default_success_statuses(),
				retry_unit: DEFAULT_RETRY_UNIT_MS,
				jitter: false,
			},
		}
	}

	/// Sets the path prefix.
	pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.config.path_prefix = Some(prefix.into());

		self
	}

	/// Sets the attempt budget (non-positive selects the default).
	pub fn max_attempts(mut self, attempts: i32) -> Self {
		self.config.max_attempts = Some(attempts);

		self
	}

	/// Selects the authentication strategy.
	pub fn authentication(mut self, strategy: impl Into<AuthenticationStrategy>) -> Self {
		self.config.authentication = strategy.into();

		self
	}

	/// Overrides the token expiry buffer (whole seconds).
	pub fn token_buffer(mut self, buffer: StdDuration) -> Self {
		self.config.token_buffer = buffer.as_secs();

		self
	}

	/// Overrides the per-request timeout (whole seconds).
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.config.request_timeout = timeout.as_secs();

		self
	}

	/// Replaces the success status set.
	pub fn success_statuses<I>(mut self, statuses: I) -> Self
	where
		I: IntoIterator<Item = u16>,
	{
		self.config.success_statuses = statuses.into_iter().collect();

		self
	}

	/// Overrides the backoff unit (whole milliseconds).
	pub fn retry_unit(mut self, unit: StdDuration) -> Self {
		self.config.retry_unit = u64::try_from(unit.as_millis()).unwrap_or(u64::MAX);

		self
	}

	/// Enables or disables backoff jitter.
	pub fn jitter(mut self, jitter: bool) -> Self {
		self.config.jitter = jitter;

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

fn default_token_buffer() -> u64 {
	DEFAULT_TOKEN_BUFFER_SECS
}

fn default_request_timeout() -> u64 {
	DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_success_statuses() -> Vec<u16> {
	DEFAULT_SUCCESS_STATUSES.to_vec()
}

fn default_retry_unit() -> u64 {
	DEFAULT_RETRY_UNIT_MS
}
