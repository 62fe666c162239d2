//! Ambient credential assembled from process environment variables.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, Secret, TenantId},
	credential::{ClientSecretCredential, CredentialFuture, CredentialSource, TokenRequest},
	error::ConfigError,
	http::HttpTransport,
};

/// Variable holding the directory (tenant) identifier.
pub const TENANT_ID_VAR: &str = "AZURE_TENANT_ID";
/// Variable holding the application (client) identifier.
pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
/// Variable holding the application secret.
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";
/// Optional variable overriding the identity-provider authority.
pub const AUTHORITY_HOST_VAR: &str = "AZURE_AUTHORITY_HOST";

/// Client-secret credential whose parameters come from the environment.
///
/// This is the fallback used by bearer strategies when no source is injected.
#[derive(Debug)]
pub struct EnvironmentCredential {
	inner: ClientSecretCredential,
}
impl EnvironmentCredential {
	/// Reads the `AZURE_*` variables from the process environment.
	pub fn from_env(transport: Arc<dyn HttpTransport>) -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok(), transport)
	}

	/// Resolves variables through `lookup` instead of the process environment.
	pub fn from_lookup<F>(
		lookup: F,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |name: &'static str| {
			lookup(name)
				.filter(|value| !value.trim().is_empty())
				.ok_or(ConfigError::MissingEnvironment { name })
		};
		let tenant_id = TenantId::new(required(TENANT_ID_VAR)?)?;
		let client_id = ClientId::new(required(CLIENT_ID_VAR)?)?;
		let secret = Secret::new(required(CLIENT_SECRET_VAR)?);
		let inner = match lookup(AUTHORITY_HOST_VAR).filter(|value| !value.trim().is_empty()) {
			Some(value) => {
				let authority = Url::parse(&value)
					.map_err(|source| ConfigError::InvalidUrl { value: value.clone(), source })?;

				ClientSecretCredential::with_authority(
					tenant_id, client_id, secret, &authority, transport,
				)?
			},
			None => ClientSecretCredential::new(tenant_id, client_id, secret, transport)?,
		};

		Ok(Self { inner })
	}

	/// Underlying client-secret credential.
	pub fn inner(&self) -> &ClientSecretCredential {
		&self.inner
	}
}
impl CredentialSource for EnvironmentCredential {
	fn acquire<'a>(
		&'a self,
		request: TokenRequest<'a>,
		cancel: &'a CancellationToken,
	) -> CredentialFuture<'a, AccessToken> {
		self.inner.acquire(request, cancel)
	}
}
