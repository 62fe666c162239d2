//! Transport primitives for executing prepared requests.
//!
//! [`HttpTransport`] is the executor's only dependency on an HTTP stack: it receives the
//! resolved [`Endpoint`] and a fully decorated [`RequestDescriptor`] and returns a
//! [`RawResponse`] or a [`TransportError`]. The default implementation, `ReqwestTransport`
//! (feature `reqwest`), keeps one pooled client per endpoint. The same transport also carries
//! identity-provider token requests issued through the `oauth2` crate, so credential sources
//! and API calls share one connection stack.

#[cfg(feature = "reqwest")] mod pool;
#[cfg(feature = "reqwest")] pub use pool::*;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{HeaderName, HeaderValue, StatusCode},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{DecodeError, TransportError},
	request::{Endpoint, Method, RequestDescriptor},
};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of delivering a prepared request.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// executor and credential source in the process. Connection reuse is the transport's concern;
/// implementations should pool clients per [`Endpoint::key`] rather than build one per request.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` to `endpoint` and returns the status, headers, and body.
	fn send<'a>(
		&'a self,
		endpoint: &'a Endpoint,
		request: &'a RequestDescriptor,
	) -> TransportFuture<'a>;
}

/// Status, headers, and body received from the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Ordered response headers.
	pub headers: Vec<(String, String)>,
	/// Response body.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Creates a response with the provided status and body and no headers.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: Vec::new(), body: body.into() }
	}

	/// Appends a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// First header value named `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		Ok(serde_path_to_error::deserialize(&mut deserializer)?)
	}
}

/// Adapter that lets the `oauth2` crate issue token requests through an [`HttpTransport`].
#[derive(Clone)]
pub(crate) struct OAuthHttpClient(Arc<dyn HttpTransport>);
impl OAuthHttpClient {
	pub(crate) fn new(transport: Arc<dyn HttpTransport>) -> Self {
		Self(transport)
	}
}
impl<'c> AsyncHttpClient<'c> for OAuthHttpClient {
	type Error = HttpClientError<TransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let (endpoint, descriptor) = split_oauth_request(request)?;
			let raw = self
				.0
				.send(&endpoint, &descriptor)
				.await
				.map_err(|e| HttpClientError::Reqwest(Box::new(e)))?;
			let mut response = HttpResponse::new(raw.body);

			*response.status_mut() = StatusCode::from_u16(raw.status)
				.map_err(|e| HttpClientError::Other(e.to_string()))?;

			for (name, value) in raw.headers {
				if let (Ok(name), Ok(value)) =
					(HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value))
				{
					response.headers_mut().append(name, value);
				}
			}

			Ok(response)
		})
	}
}

fn split_oauth_request(
	request: HttpRequest,
) -> Result<(Endpoint, RequestDescriptor), HttpClientError<TransportError>> {
	let url = Url::parse(&request.uri().to_string())
		.map_err(|e| HttpClientError::Other(format!("token URL is invalid: {e}")))?;
	let mut origin = url.clone();

	origin.set_path("/");
	origin.set_query(None);
	origin.set_fragment(None);

	let endpoint =
		Endpoint::new(&origin, None).map_err(|e| HttpClientError::Other(e.to_string()))?;
	let method = request
		.method()
		.as_str()
		.parse::<Method>()
		.map_err(|e| HttpClientError::Other(e.to_string()))?;
	let mut descriptor = RequestDescriptor::new(method, url.path());

	descriptor.query = url.query_pairs().into_owned().collect();

	for (name, value) in request.headers() {
		if let Ok(value) = value.to_str() {
			descriptor.headers.push((name.as_str().to_owned(), value.to_owned()));
		}
	}

	let body = request.into_body();

	if !body.is_empty() {
		descriptor.body = Some(body);
	}

	Ok((endpoint, descriptor))
}
