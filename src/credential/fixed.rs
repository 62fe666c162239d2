//! Credential that serves a pre-issued token.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	credential::{CredentialFuture, CredentialSource, TokenRequest},
};

/// Returns the same token for every audience.
///
/// Useful for tokens minted out of band and for tests that must not reach an identity provider.
#[derive(Clone, Debug)]
pub struct StaticCredential {
	token: AccessToken,
}
impl StaticCredential {
	/// Wraps `token`.
	pub fn new(token: AccessToken) -> Self {
		Self { token }
	}
}
impl CredentialSource for StaticCredential {
	fn acquire<'a>(
		&'a self,
		_request: TokenRequest<'a>,
		_cancel: &'a CancellationToken,
	) -> CredentialFuture<'a, AccessToken> {
		let token = self.token.clone();

		Box::pin(async move { Ok(token) })
	}
}
