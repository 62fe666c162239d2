//! Credential sources that issue bearer tokens for an audience.
//!
//! A [`CredentialSource`] is the executor's only view of an identity provider: given an
//! audience, its canonical scope, and a cancellation signal, it returns an
//! [`AccessToken`](crate::auth::AccessToken) or a [`CredentialError`]. Results are cached by
//! [`TokenCache`](crate::cache::TokenCache); sources themselves stay stateless.
//!
//! Three sources ship with the crate:
//!
//! - [`ClientSecretCredential`] performs the OAuth 2.0 client-credentials grant for a
//!   tenant/client/secret triple.
//! - [`EnvironmentCredential`] builds the same grant from `AZURE_*` environment variables and is
//!   the ambient fallback for bearer strategies without an injected source.
//! - [`StaticCredential`] serves a pre-issued token.

pub mod client_secret;
pub mod environment;
pub mod fixed;

pub use client_secret::*;
pub use environment::*;
pub use fixed::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Audience},
	error::CredentialError,
};

/// Boxed future returned by [`CredentialSource::acquire`].
pub type CredentialFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, CredentialError>> + 'a + Send>>;

/// Token request handed to a [`CredentialSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenRequest<'a> {
	/// Audience the token is issued for.
	pub audience: &'a Audience,
	/// Canonical scope string (`{audience}/.default`).
	pub scope: &'a str,
}

/// Asynchronous issuer of audience-scoped bearer tokens.
pub trait CredentialSource
where
	Self: 'static + Send + Sync,
{
	/// Acquires a fresh token for `request`.
	///
	/// Implementations should stop work when `cancel` fires; callers race the returned future
	/// against the same token, so observing it is an optimization rather than a requirement.
	fn acquire<'a>(
		&'a self,
		request: TokenRequest<'a>,
		cancel: &'a CancellationToken,
	) -> CredentialFuture<'a, AccessToken>;
}
