//! Closed set of authentication strategies a client configuration can select.

// self
use crate::{
	_prelude::*,
	auth::{Audience, ClientId, Secret, TenantId},
};

/// Header name used for subscription keys when none is configured.
pub const DEFAULT_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
/// Query parameter name used for subscription keys when none is configured.
pub const DEFAULT_KEY_QUERY: &str = "subscription-key";

/// Authentication applied to every request issued by one client.
///
/// Exactly one strategy is active per configuration; deployments that need two mechanisms
/// (for example a subscription key and a bearer token) compose two decorators instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthenticationStrategy {
	/// Requests are sent without credentials.
	#[default]
	None,
	/// A static key attached as a header or query parameter.
	StaticKey(StaticKey),
	/// Bearer token obtained from an injected or ambient credential source.
	#[serde(rename = "bearer")]
	BearerFromCredential {
		/// Audience the token is scoped to.
		audience: Audience,
	},
	/// Bearer token obtained with a tenant/client/secret triple.
	#[serde(rename = "client_secret")]
	ClientSecretCredential {
		/// Audience the token is scoped to.
		audience: Audience,
		/// Directory the application is registered in.
		tenant_id: TenantId,
		/// Application identifier.
		client_id: ClientId,
		/// Application secret.
		secret: Secret,
	},
}
impl AuthenticationStrategy {
	/// Audience for bearer-based strategies.
	pub fn audience(&self) -> Option<&Audience> {
		match self {
			Self::BearerFromCredential { audience } | Self::ClientSecretCredential { audience, .. } =>
				Some(audience),
			Self::None | Self::StaticKey(_) => None,
		}
	}

	/// Stable label suitable for span or metric fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::None => "none",
			Self::StaticKey(_) => "static_key",
			Self::BearerFromCredential { .. } => "bearer",
			Self::ClientSecretCredential { .. } => "client_secret",
		}
	}
}
impl From<StaticKey> for AuthenticationStrategy {
	fn from(key: StaticKey) -> Self {
		Self::StaticKey(key)
	}
}

/// Where a static key is attached on the outgoing request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPlacement {
	/// Request header.
	#[default]
	Header,
	/// Query-string parameter.
	Query,
}

/// Static key configuration, optionally carrying a legacy secondary key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticKey {
	/// Header or query parameter name.
	#[serde(default = "default_key_header")]
	pub name: String,
	/// Placement of the key on the request.
	#[serde(default)]
	pub placement: KeyPlacement,
	/// Primary key; an empty key attaches nothing.
	pub key: Secret,
	/// Secondary key tried once when the primary is rejected as invalid.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fallback_key: Option<Secret>,
}
impl StaticKey {
	/// Key sent as the default subscription-key header.
	pub fn header(key: impl Into<Secret>) -> Self {
		Self {
			name: DEFAULT_KEY_HEADER.into(),
			placement: KeyPlacement::Header,
			key: key.into(),
			fallback_key: None,
		}
	}

	/// Key sent as the default subscription-key query parameter.
	pub fn query(key: impl Into<Secret>) -> Self {
		Self {
			name: DEFAULT_KEY_QUERY.into(),
			placement: KeyPlacement::Query,
			key: key.into(),
			fallback_key: None,
		}
	}

	/// Overrides the header or query parameter name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();

		self
	}

	/// Configures the legacy secondary key.
	pub fn with_fallback(mut self, key: impl Into<Secret>) -> Self {
		let key = key.into();

		self.fallback_key = if key.is_empty() { None } else { Some(key) };

		self
	}
}

fn default_key_header() -> String {
	DEFAULT_KEY_HEADER.into()
}
