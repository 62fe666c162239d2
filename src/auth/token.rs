//! Immutable bearer token issued for an audience.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{_prelude::*, auth::Secret};

/// Bearer token plus its true expiry instant.
///
/// Tokens are never mutated; a refresh replaces the cached value wholesale.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Token value; callers must avoid logging it.
	pub token: Secret,
	/// Expiry instant reported by the identity provider.
	pub expires_on: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token from its value and absolute expiry.
	pub fn new(token: impl Into<String>, expires_on: OffsetDateTime) -> Self {
		Self { token: Secret::new(token), expires_on }
	}

	/// Creates a token that expires `lifetime` after `now`, saturating on overflow.
	pub fn expiring_in(token: impl Into<String>, now: OffsetDateTime, lifetime: Duration) -> Self {
		let expires_on = now.checked_add(lifetime).unwrap_or_else(|| {
			let date = if lifetime.is_negative() { time::Date::MIN } else { time::Date::MAX };

			PrimitiveDateTime::new(date, time::Time::MIDNIGHT).assume_utc()
		});

		Self::new(token, expires_on)
	}

	/// Instant after which the token must no longer be served from cache.
	///
	/// Returns `None` when subtracting `buffer` leaves the representable range.
	pub fn effective_expiry(&self, buffer: Duration) -> Option<OffsetDateTime> {
		self.expires_on.checked_sub(buffer)
	}

	/// Returns `true` while `now < expires_on - buffer`.
	///
	/// Underflowing buffer arithmetic counts as already expired.
	pub fn is_usable_at(&self, now: OffsetDateTime, buffer: Duration) -> bool {
		match self.effective_expiry(buffer) {
			Some(deadline) => now < deadline,
			None => false,
		}
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("token", &"<redacted>")
			.field("expires_on", &self.expires_on)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn usable_only_before_buffered_expiry() {
		let token = AccessToken::new("t", macros::datetime!(2025-01-01 01:00 UTC));
		let buffer = Duration::minutes(5);

		assert!(token.is_usable_at(macros::datetime!(2025-01-01 00:54 UTC), buffer));
		assert!(!token.is_usable_at(macros::datetime!(2025-01-01 00:55 UTC), buffer));
		assert!(!token.is_usable_at(macros::datetime!(2025-01-01 01:30 UTC), buffer));
		assert!(token.is_usable_at(macros::datetime!(2025-01-01 00:59 UTC), Duration::ZERO));
	}

	#[test]
	fn underflowing_buffer_counts_as_expired() {
		let floor = PrimitiveDateTime::new(time::Date::MIN, time::Time::MIDNIGHT).assume_utc();
		let token = AccessToken::new("ancient", floor);

		assert_eq!(token.effective_expiry(Duration::minutes(5)), None);
		assert!(!token.is_usable_at(floor, Duration::minutes(5)));
	}

	#[test]
	fn expiring_in_saturates() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let token = AccessToken::expiring_in("t", now, Duration::MAX);

		assert_eq!(token.expires_on.date(), time::Date::MAX);

		let token = AccessToken::expiring_in("t", now, Duration::hours(1));

		assert_eq!(token.expires_on, macros::datetime!(2025-01-01 01:00 UTC));
	}

	#[test]
	fn debug_redacts_token() {
		let token = AccessToken::new("super-secret", macros::datetime!(2025-01-01 01:00 UTC));

		assert!(!format!("{token:?}").contains("super-secret"));
	}
}
