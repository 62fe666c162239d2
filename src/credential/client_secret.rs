//! Confidential-client credential backed by the OAuth 2.0 client-credentials grant.

// crates.io
use oauth2::{
	AuthType, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RequestTokenError, Scope,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, Secret, TenantId},
	credential::{CredentialFuture, CredentialSource, TokenRequest},
	error::{ConfigError, CredentialError, TransportError},
	http::{HttpTransport, OAuthHttpClient},
};

/// Identity-provider authority used when none is configured.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

type TokenClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Issues tokens with a tenant/client/secret triple.
///
/// Token requests are posted to `{authority}/{tenant}/oauth2/v2.0/token` with the client
/// secret in the form body and the audience's `/.default` scope. The request travels through
/// the same [`HttpTransport`] API calls use.
pub struct ClientSecretCredential {
	tenant_id: TenantId,
	client_id: ClientId,
	token_url: Url,
	oauth_client: TokenClient,
	http_client: OAuthHttpClient,
}
impl ClientSecretCredential {
	/// Creates a credential against the default authority.
	pub fn new(
		tenant_id: TenantId,
		client_id: ClientId,
		secret: Secret,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self, ConfigError> {
		let authority = Url::parse(DEFAULT_AUTHORITY).map_err(|source| {
			ConfigError::InvalidUrl { value: DEFAULT_AUTHORITY.into(), source }
		})?;

		Self::with_authority(tenant_id, client_id, secret, &authority, transport)
	}

	/// Creates a credential against a custom authority (sovereign clouds, test doubles).
	pub fn with_authority(
		tenant_id: TenantId,
		client_id: ClientId,
		secret: Secret,
		authority: &Url,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self, ConfigError> {
		let token_url = token_url(authority, &tenant_id)?;
		let oauth_client = BasicClient::new(oauth2::ClientId::new(client_id.to_string()))
			.set_client_secret(ClientSecret::new(secret.expose().to_owned()))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(TokenUrl::from_url(token_url.clone()));

		Ok(Self {
			tenant_id,
			client_id,
			token_url,
			oauth_client,
			http_client: OAuthHttpClient::new(transport),
		})
	}

	/// Token endpoint the credential posts to.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}
}
impl CredentialSource for ClientSecretCredential {
	fn acquire<'a>(
		&'a self,
		request: TokenRequest<'a>,
		_cancel: &'a CancellationToken,
	) -> CredentialFuture<'a, AccessToken> {
		Box::pin(async move {
			let response = self
				.oauth_client
				.exchange_client_credentials()
				.add_scope(Scope::new(request.scope.to_owned()))
				.request_async(&self.http_client)
				.await
				.map_err(map_request_error)?;
			let lifetime = response.expires_in().ok_or_else(|| CredentialError::InvalidResponse {
				message: "token response is missing `expires_in`".into(),
			})?;
			let lifetime =
				Duration::try_from(lifetime).map_err(|_| CredentialError::InvalidResponse {
					message: "`expires_in` is out of range".into(),
				})?;

			if !lifetime.is_positive() {
				return Err(CredentialError::InvalidResponse {
					message: "`expires_in` must be positive".into(),
				});
			}

			Ok(AccessToken::expiring_in(
				response.access_token().secret().to_owned(),
				OffsetDateTime::now_utc(),
				lifetime,
			))
		})
	}
}
impl Debug for ClientSecretCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSecretCredential")
			.field("tenant_id", &self.tenant_id)
			.field("client_id", &self.client_id)
			.field("token_url", &self.token_url.as_str())
			.finish()
	}
}

fn token_url(authority: &Url, tenant_id: &TenantId) -> Result<Url, ConfigError> {
	let base = authority.as_str().trim_end_matches('/');
	let value = format!("{base}/{tenant_id}/oauth2/v2.0/token");

	Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { value, source })
}

fn map_request_error(
	err: BasicRequestTokenError<HttpClientError<TransportError>>,
) -> CredentialError {
	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			CredentialError::Rejected { reason }
		},
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) =>
			CredentialError::Transport(*inner),
		RequestTokenError::Request(HttpClientError::Io(inner)) =>
			CredentialError::Transport(TransportError::Io(inner)),
		RequestTokenError::Request(HttpClientError::Http(inner)) =>
			CredentialError::Transport(TransportError::Build { message: inner.to_string() }),
		RequestTokenError::Request(HttpClientError::Other(message)) =>
			CredentialError::Transport(TransportError::Build { message }),
		RequestTokenError::Request(_) =>
			CredentialError::InvalidResponse { message: "HTTP client failed".into() },
		RequestTokenError::Parse(source, _body) =>
			CredentialError::InvalidResponse { message: source.to_string() },
		RequestTokenError::Other(message) => CredentialError::InvalidResponse { message },
	}
}
