//! Request decoration hooks that attach credentials to outgoing descriptors.
//!
//! [`AuthDecorator`] applies exactly one [`AuthenticationStrategy`]. Deployments that need two
//! mechanisms on the same call (a subscription key and a bearer token, say) register two
//! decorators with the executor; they run in registration order on every attempt.

// self
use crate::{
	_prelude::*,
	auth::{AuthenticationStrategy, KeyPlacement, StaticKey},
	cache::TokenCache,
	error::ConfigError,
	request::RequestDescriptor,
};

/// Header carrying bearer tokens.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Boxed future returned by [`RequestDecorator::decorate`].
pub type DecorateFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Mutates a request before it is sent.
///
/// Decorators run once per attempt on a fresh copy of the caller's descriptor, so they may
/// consult time-dependent state such as cached tokens without worrying about stale values.
pub trait RequestDecorator
where
	Self: 'static + Send + Sync,
{
	/// Attaches whatever the decorator is responsible for to `request`.
	fn decorate<'a>(
		&'a self,
		request: &'a mut RequestDescriptor,
		cancel: &'a CancellationToken,
	) -> DecorateFuture<'a>;
}

/// Applies one authentication strategy.
#[derive(Clone, Debug)]
pub struct AuthDecorator {
	strategy: AuthenticationStrategy,
	cache: Option<Arc<TokenCache>>,
}
impl AuthDecorator {
	/// Creates a decorator for `strategy`.
	///
	/// Bearer strategies require a token cache; static-key strategies require a parameter name.
	pub fn new(
		strategy: AuthenticationStrategy,
		cache: Option<Arc<TokenCache>>,
	) -> Result<Self, ConfigError> {
		match &strategy {
			AuthenticationStrategy::StaticKey(key) if key.name.trim().is_empty() =>
				return Err(ConfigError::MissingKeyName),
			AuthenticationStrategy::BearerFromCredential { audience }
			| AuthenticationStrategy::ClientSecretCredential { audience, .. }
				if cache.is_none() =>
				return Err(ConfigError::MissingCredentialSource { audience: audience.to_string() }),
			_ => {},
		}

		Ok(Self { strategy, cache })
	}

	/// Decorator that leaves requests untouched.
	pub fn none() -> Self {
		Self { strategy: AuthenticationStrategy::None, cache: None }
	}

	/// Strategy applied by this decorator.
	pub fn strategy(&self) -> &AuthenticationStrategy {
		&self.strategy
	}
}
impl RequestDecorator for AuthDecorator {
	fn decorate<'a>(
		&'a self,
		request: &'a mut RequestDescriptor,
		cancel: &'a CancellationToken,
	) -> DecorateFuture<'a> {
		Box::pin(async move {
			match &self.strategy {
				AuthenticationStrategy::None => Ok(()),
				AuthenticationStrategy::StaticKey(key) => {
					attach_static_key(request, key);

					Ok(())
				},
				AuthenticationStrategy::BearerFromCredential { audience }
				| AuthenticationStrategy::ClientSecretCredential { audience, .. } => {
					let cache = self.cache.as_ref().ok_or_else(|| {
						ConfigError::MissingCredentialSource { audience: audience.to_string() }
					})?;
					let token = cache.get_token(audience, cancel).await?;
					let value = format!("Bearer {}", token.token.expose());

					request.set_header(AUTHORIZATION_HEADER, value);

					Ok(())
				},
			}
		})
	}
}

fn attach_static_key(request: &mut RequestDescriptor, key: &StaticKey) {
	if key.key.is_empty() {
		return;
	}

	match key.placement {
		KeyPlacement::Header => request.set_header(&key.name, key.key.expose()),
		KeyPlacement::Query => request.set_query(&key.name, key.key.expose()),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		auth::{AccessToken, Audience},
		credential::StaticCredential,
		request::Method,
	};

	fn request() -> RequestDescriptor {
		RequestDescriptor::new(Method::Get, "orders")
	}

	#[tokio::test]
	async fn static_keys_land_in_header_or_query() {
		let cancel = CancellationToken::new();
		let header = AuthDecorator::new(StaticKey::header("k1").into(), None)
			.expect("Header key should be accepted.");
		let mut req = request();

		header.decorate(&mut req, &cancel).await.expect("Decoration should succeed.");

		assert_eq!(req.header("Ocp-Apim-Subscription-Key"), Some("k1"));
		assert!(req.query.is_empty());

		let query = AuthDecorator::new(StaticKey::query("k2").with_name("code").into(), None)
			.expect("Query key should be accepted.");
		let mut req = request();

		query.decorate(&mut req, &cancel).await.expect("Decoration should succeed.");

		assert_eq!(req.query_value("code"), Some("k2"));
		assert!(req.headers.is_empty());
	}

	#[tokio::test]
	async fn empty_key_and_none_are_no_ops() {
		let cancel = CancellationToken::new();
		let mut req = request();

		AuthDecorator::new(StaticKey::header("").into(), None)
			.expect("Empty key should be accepted.")
			.decorate(&mut req, &cancel)
			.await
			.expect("Decoration should succeed.");
		AuthDecorator::none().decorate(&mut req, &cancel).await.expect("Decoration should succeed.");

		assert_eq!(req, request());
	}

	#[tokio::test]
	async fn bearer_uses_cached_token() {
		let token = AccessToken::new("abc", macros::datetime!(2099-01-01 00:00 UTC));
		let cache = Arc::new(TokenCache::new(Arc::new(StaticCredential::new(token))));
		let audience = Audience::new("api://orders").expect("Audience fixture should be valid.");
		let decorator =
			AuthDecorator::new(AuthenticationStrategy::BearerFromCredential { audience }, Some(cache))
				.expect("Bearer strategy with cache should be accepted.");
		let mut req = request().with_header("authorization", "stale");

		decorator
			.decorate(&mut req, &CancellationToken::new())
			.await
			.expect("Decoration should succeed.");

		assert_eq!(req.header("Authorization"), Some("Bearer abc"));
		assert_eq!(req.headers.len(), 1);
	}

	#[test]
	fn invalid_configurations_are_rejected() {
		let audience = Audience::new("api://orders").expect("Audience fixture should be valid.");

		assert!(matches!(
			AuthDecorator::new(AuthenticationStrategy::BearerFromCredential { audience }, None),
			Err(ConfigError::MissingCredentialSource { .. })
		));
		assert!(matches!(
			AuthDecorator::new(StaticKey::header("k").with_name(" ").into(), None),
			Err(ConfigError::MissingKeyName)
		));
	}
}
