//! Request descriptors and endpoint resolution.
//!
//! A [`RequestDescriptor`] is built fresh for every logical call and owned by that call; the
//! executor clones it per attempt so decorations (keys, bearer tokens) never leak between
//! attempts. [`Endpoint`] joins a base URL and optional path prefix into the slash-normalized
//! root every resource path is resolved against.

// self
use crate::{_prelude::*, error::ConfigError};

/// HTTP methods the executor can issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `HEAD`
	Head,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
	/// `OPTIONS`
	Options,
}
impl Method {
	/// Returns the canonical upper-case method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Head => "HEAD",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
			Method::Options => "OPTIONS",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Method {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let method = match s.to_ascii_uppercase().as_str() {
			"GET" => Method::Get,
			"HEAD" => Method::Head,
			"POST" => Method::Post,
			"PUT" => Method::Put,
			"PATCH" => Method::Patch,
			"DELETE" => Method::Delete,
			"OPTIONS" => Method::Options,
			other =>
				return Err(Error::InvalidRequest {
					reason: format!("unsupported method `{other}`"),
				}),
		};

		Ok(method)
	}
}

/// One logical call: resource path, method, ordered headers and query pairs, optional body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
	/// Resource path relative to the endpoint root.
	pub resource: String,
	/// HTTP method.
	pub method: Method,
	/// Ordered header multimap.
	pub headers: Vec<(String, String)>,
	/// Ordered query parameter multimap.
	pub query: Vec<(String, String)>,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl RequestDescriptor {
	/// Creates a descriptor without headers, query parameters, or body.
	pub fn new(method: Method, resource: impl Into<String>) -> Self {
		Self { resource: resource.into(), method, headers: Vec::new(), query: Vec::new(), body: None }
	}

	/// Appends a header, keeping any existing values for the same name.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Appends a query parameter, keeping any existing values for the same name.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Sets a raw body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `payload` as the JSON body and sets `Content-Type: application/json`.
	pub fn with_json<T>(mut self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(payload)
			.map_err(|e| Error::InvalidRequest { reason: format!("body is not serializable: {e}") })?;

		self.set_header("Content-Type", "application/json");
		self.body = Some(body);

		Ok(self)
	}

	/// Replaces every header named `name` (case-insensitive) with a single value.
	pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
		self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
		self.headers.push((name.to_owned(), value.into()));
	}

	/// Replaces every query parameter named `name` with a single value.
	pub fn set_query(&mut self, name: &str, value: impl Into<String>) {
		self.query.retain(|(key, _)| key != name);
		self.query.push((name.to_owned(), value.into()));
	}

	/// First header value named `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// First query value named `name`.
	pub fn query_value(&self, name: &str) -> Option<&str> {
		self.query.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
	}
}

/// Slash-normalized root URL (base URL plus optional path prefix) resources resolve against.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint(Url);
impl Endpoint {
	/// Joins `base_url` and `path_prefix`, collapsing duplicate slashes at the seam.
	pub fn new(base_url: &Url, path_prefix: Option<&str>) -> Result<Self, ConfigError> {
		if base_url.cannot_be_a_base()
			|| !matches!(base_url.scheme(), "http" | "https")
			|| base_url.query().is_some()
			|| base_url.fragment().is_some()
		{
			return Err(ConfigError::UnsupportedBaseUrl { url: base_url.to_string() });
		}

		let mut root = base_url.as_str().trim_end_matches('/').to_owned();

		if let Some(prefix) = path_prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
			root.push('/');
			root.push_str(prefix);
		}

		root.push('/');

		let url = Url::parse(&root).map_err(|source| ConfigError::InvalidUrl { value: root, source })?;

		Ok(Self(url))
	}

	/// Root URL, always ending in `/`.
	pub fn as_url(&self) -> &Url {
		&self.0
	}

	/// Stable key used to pool transport clients per endpoint.
	pub fn key(&self) -> &str {
		self.0.as_str()
	}

	/// Resolves `resource` under the root and appends `query` in order.
	///
	/// Absolute URLs, `..` segments, and anything else that would resolve outside the root are
	/// rejected so decorated credentials never leave the configured endpoint.
	pub fn url_for(&self, resource: &str, query: &[(String, String)]) -> Result<Url> {
		let invalid = |why: &str| Error::InvalidRequest {
			reason: format!("resource `{resource}` {why}"),
		};
		let relative = resource.trim_start_matches(['/', '\\']);

		if has_scheme(relative) {
			return Err(invalid("must be relative to the endpoint"));
		}
		if climbs_out(relative) {
			return Err(invalid("must not contain `..` segments"));
		}

		let mut url =
			self.0.join(relative).map_err(|e| invalid(&format!("cannot be resolved: {e}")))?;

		if url.origin() != self.0.origin() || !url.path().starts_with(self.0.path()) {
			return Err(invalid("resolves outside the endpoint root"));
		}

		if !query.is_empty() {
			let mut pairs = url.query_pairs_mut();

			for (key, value) in query {
				pairs.append_pair(key, value);
			}
		}

		Ok(url)
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.0.as_str())
	}
}

fn has_scheme(resource: &str) -> bool {
	let Some((scheme, _)) = resource.split_once(':') else {
		return false;
	};
	let mut chars = scheme.chars();

	chars.next().is_some_and(|c| c.is_ascii_alphabetic())
		&& chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn climbs_out(resource: &str) -> bool {
	let path = resource.split(['?', '#']).next().unwrap_or_default();

	path.split(['/', '\\'])
		.any(|segment| segment.to_ascii_lowercase().replace("%2e", ".") == "..")
}
