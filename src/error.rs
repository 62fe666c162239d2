//! Executor-level error types shared across authentication, transport, and classification.

// self
use crate::{_prelude::*, auth::Audience};

/// Executor-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error used for opaque root causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Not-found and validation responses are not errors; they surface as
/// [`Outcome`](crate::classify::Outcome) variants.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential or token acquisition failed; never retried.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// Non-retryable response, or retries exhausted.
	#[error(transparent)]
	Fatal(#[from] FatalError),
	/// Payload could not be decoded into the requested type.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// Caller supplied a request that cannot be executed.
	#[error("Request is invalid: {}.", sentence(.reason))]
	InvalidRequest {
		/// Human-readable reason string.
		reason: String,
	},
	/// Cooperative cancellation was observed.
	#[error("Call was canceled.")]
	Canceled,
}
impl Error {
	/// Returns `true` when the error represents cooperative cancellation.
	pub fn is_canceled(&self) -> bool {
		matches!(self, Self::Canceled)
	}

	/// HTTP status code attached to the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Fatal(err) => err.status,
			_ => None,
		}
	}
}

/// Configuration and validation failures raised while assembling a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL or authority cannot be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending input.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses an unsupported shape.
	#[error("Base URL `{url}` must be an absolute http(s) URL without query or fragment.")]
	UnsupportedBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Identifier validation failed.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// A static key strategy is missing its parameter name.
	#[error("Static key strategy requires a non-empty parameter name.")]
	MissingKeyName,
	/// A bearer strategy was configured without any credential source.
	#[error("Audience `{audience}` requires a credential source, but none is configured.")]
	MissingCredentialSource {
		/// Audience the strategy targets.
		audience: String,
	},
	/// No transport was supplied and the default transport is disabled.
	#[error("No HTTP transport is configured.")]
	MissingTransport,
	/// Configured success status is not a valid HTTP status code.
	#[error("Success status `{status}` is outside the 100..=599 range.")]
	InvalidSuccessStatus {
		/// Offending status.
		status: u16,
	},
	/// Required environment variable is absent.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnvironment {
		/// Variable name.
		name: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token acquisition failure for an audience.
#[derive(Debug, ThisError)]
#[error("Failed to acquire a token for audience `{audience}`.")]
pub struct AuthenticationError {
	/// Audience the token was requested for.
	pub audience: Audience,
	/// Root cause reported by the credential source.
	#[source]
	pub source: CredentialError,
}

/// Terminal failure carrying the observed status, a message, and the underlying cause.
#[derive(Debug, ThisError)]
#[error("{}", render_fatal(.status, .message))]
pub struct FatalError {
	/// HTTP status code, when a response was received.
	pub status: Option<u16>,
	/// Human-readable summary (often the raw response body).
	pub message: String,
	/// Underlying cause, when available.
	#[source]
	pub source: Option<BoxError>,
}
impl FatalError {
	/// Creates an error for a received HTTP response.
	pub fn from_status(status: u16, message: impl Into<String>) -> Self {
		Self { status: Some(status), message: message.into(), source: None }
	}

	/// Creates an error for a failure that produced no response.
	pub fn without_response(
		message: impl Into<String>,
		source: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self { status: None, message: message.into(), source: Some(Box::new(source)) }
	}

	/// Attaches an underlying cause.
	pub fn with_source(mut self, source: impl 'static + Send + Sync + std::error::Error) -> Self {
		self.source = Some(Box::new(source));

		self
	}
}

fn render_fatal(status: &Option<u16>, message: &str) -> String {
	match status {
		Some(code) => format!("Request failed with HTTP {code}: {message}"),
		None => format!("Request failed without a response: {message}"),
	}
}

/// Transport-level failures (network, IO, request construction).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client timed out.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Request could not be converted into the transport's representation.
	#[error("Request could not be built: {}.", sentence(.message))]
	Build {
		/// Human-readable error payload.
		message: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout { source: Box::new(e) }
		} else if e.is_builder() {
			Self::Build { message: e.to_string() }
		} else {
			Self::network(e)
		}
	}
}

/// Failures reported by a [`CredentialSource`](crate::credential::CredentialSource).
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// Identity provider rejected the credential.
	#[error("Identity provider rejected the credential: {}.", sentence(.reason))]
	Rejected {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Identity provider could not be reached.
	#[error("Identity provider could not be reached.")]
	Transport(#[from] TransportError),
	/// Identity provider returned a response the credential could not interpret.
	#[error("Identity provider returned an unusable response: {}.", sentence(.message))]
	InvalidResponse {
		/// Human-readable error payload.
		message: String,
	},
	/// Credential source is misconfigured.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Any other credential-specific failure.
	#[error("{0}")]
	Other(#[source] BoxError),
}
impl CredentialError {
	/// Wraps an arbitrary credential failure.
	pub fn other(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Other(Box::new(src))
	}
}

/// JSON payload decoding failure.
#[derive(Debug, ThisError)]
#[error("Response body could not be decoded at `{path}`.")]
pub struct DecodeError {
	/// JSON path where decoding failed.
	pub path: String,
	/// Structured parsing failure.
	#[source]
	pub source: serde_json::Error,
}
impl From<serde_path_to_error::Error<serde_json::Error>> for DecodeError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self { path, source: e.into_inner() }
	}
}

// Strips trailing periods so wrapped messages end in exactly one.
fn sentence(message: &str) -> &str {
	message.trim_end_matches('.')
}
