//! Reqwest-backed transport with one pooled client per endpoint.

// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	http::{HttpTransport, RawResponse, TransportFuture},
	request::{Endpoint, RequestDescriptor},
};

/// Default per-request timeout applied to pooled clients.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(100);

/// Endpoint-keyed registry of reqwest clients.
///
/// Clients are created on first use for an endpoint and reused for every later call, so
/// connection pools are never rebuilt per request. The registry is owned by whichever
/// composition root constructs it; there is no process-global instance.
#[derive(Debug)]
pub struct ClientPool {
	clients: Mutex<HashMap<String, ReqwestClient>>,
	timeout: StdDuration,
}
impl ClientPool {
	/// Creates an empty pool whose clients apply `timeout` to every request.
	pub fn new(timeout: StdDuration) -> Self {
		Self { clients: Default::default(), timeout }
	}

	/// Returns the client for `endpoint`, creating it on first use.
	pub fn client_for(&self, endpoint: &Endpoint) -> Result<ReqwestClient, ConfigError> {
		let mut clients = self.clients.lock();

		if let Some(client) = clients.get(endpoint.key()) {
			return Ok(client.clone());
		}

		let client = ReqwestClient::builder().timeout(self.timeout).build()?;

		clients.insert(endpoint.key().to_owned(), client.clone());

		Ok(client)
	}

	/// Number of endpoints with a live client.
	pub fn len(&self) -> usize {
		self.clients.lock().len()
	}

	/// Returns `true` when no client has been created yet.
	pub fn is_empty(&self) -> bool {
		self.clients.lock().is_empty()
	}
}
impl Default for ClientPool {
	fn default() -> Self {
		Self::new(DEFAULT_REQUEST_TIMEOUT)
	}
}

/// [`HttpTransport`] implementation backed by reqwest.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
	pool: Arc<ClientPool>,
}
impl ReqwestTransport {
	/// Creates a transport whose pooled clients apply `timeout`.
	pub fn new(timeout: StdDuration) -> Self {
		Self::with_pool(Arc::new(ClientPool::new(timeout)))
	}

	/// Creates a transport sharing an existing pool.
	pub fn with_pool(pool: Arc<ClientPool>) -> Self {
		Self { pool }
	}

	/// Underlying client pool.
	pub fn pool(&self) -> &ClientPool {
		&self.pool
	}
}
impl HttpTransport for ReqwestTransport {
	fn send<'a>(
		&'a self,
		endpoint: &'a Endpoint,
		request: &'a RequestDescriptor,
	) -> TransportFuture<'a> {
		Box::pin(async move {
			let client = self
				.pool
				.client_for(endpoint)
				.map_err(|e| TransportError::Build { message: e.to_string() })?;
			let url = endpoint
				.url_for(&request.resource, &request.query)
				.map_err(|e| TransportError::Build { message: e.to_string() })?;
			let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
				.map_err(|e| TransportError::Build { message: e.to_string() })?;
			let mut builder = client.request(method, url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &request.body {
				builder = builder.body(body.clone());
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(RawResponse { status, headers, body })
		})
	}
}
