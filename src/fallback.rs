//! Legacy secondary subscription-key fallback.
//!
//! Older deployments configured a primary and a secondary static key. When the gateway rejects
//! the primary with its "invalid subscription key" message, the call is resent once with the
//! secondary key substituted. The fallback sits outside the retry policy and never consumes an
//! attempt; executors built without it behave as if the path did not exist.

// self
use crate::{
	_prelude::*,
	auth::{KeyPlacement, Secret, StaticKey},
	http::RawResponse,
	request::RequestDescriptor,
};

/// Body fragment API gateways return when a subscription key is rejected.
pub const INVALID_SUBSCRIPTION_KEY_MARKER: &str = "invalid subscription key";

/// One-shot substitution of a rejected primary key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecondaryKeyFallback {
	name: String,
	placement: KeyPlacement,
	key: Secret,
	marker: String,
}
impl SecondaryKeyFallback {
	/// Builds the fallback from a static key that carries a secondary value.
	pub fn from_static_key(key: &StaticKey) -> Option<Self> {
		let secondary = key.fallback_key.as_ref().filter(|secret| !secret.is_empty())?;

		Some(Self {
			name: key.name.clone(),
			placement: key.placement,
			key: secondary.clone(),
			marker: INVALID_SUBSCRIPTION_KEY_MARKER.into(),
		})
	}

	/// Overrides the body fragment that identifies a rejected key.
	pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
		self.marker = marker.into();

		self
	}

	/// Returns `true` for a 401 whose body names the key as invalid.
	pub fn applies_to(&self, response: &RawResponse) -> bool {
		response.status == 401
			&& response.text().to_ascii_lowercase().contains(&self.marker.to_ascii_lowercase())
	}

	/// Replaces the primary key on `request` with the secondary key.
	pub fn substitute(&self, request: &mut RequestDescriptor) {
		match self.placement {
			KeyPlacement::Header => request.set_header(&self.name, self.key.expose()),
			KeyPlacement::Query => request.set_query(&self.name, self.key.expose()),
		}
	}
}
