//! Strongly typed identifiers for audiences and confidential-client credentials.
//!
//! Identifiers are validated once at construction and stored as shared `Arc<str>` so they can be
//! cloned into cache keys and spans on every call without reallocating.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! identifier {
	($(#[$meta:meta])* $name:ident => $kind:literal) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(Arc<str>);
		impl $name {
			/// Validates `value` and wraps it.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let value = value.as_ref();

				check($kind, value)?;

				Ok(Self(Arc::from(value)))
			}

			/// Borrowed view of the identifier.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0.as_ref().to_owned()
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.debug_tuple(stringify!($name)).field(&&*self.0).finish()
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 256;
const DEFAULT_SCOPE_SUFFIX: &str = "/.default";

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (audience, tenant, client).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (audience, tenant, client).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (audience, tenant, client).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

identifier! {
	/// Credential scope identifying the API a bearer token grants access to.
	Audience => "Audience"
}
identifier! {
	/// Directory (tenant) identifier for confidential-client credentials.
	TenantId => "Tenant"
}
identifier! {
	/// Application (client) identifier for confidential-client credentials.
	ClientId => "Client"
}

impl Audience {
	/// Canonical token scope for the audience: `{audience}/.default`.
	///
	/// Trailing slashes are collapsed so `api://x/` and `api://x` share one scope.
	pub fn default_scope(&self) -> String {
		let trimmed = self.0.trim_end_matches('/');

		format!("{trimmed}{DEFAULT_SCOPE_SUFFIX}")
	}
}

fn check(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	match value {
		"" => Err(IdentifierError::Empty { kind }),
		v if v.chars().any(char::is_whitespace) => Err(IdentifierError::ContainsWhitespace { kind }),
		v if v.chars().count() > IDENTIFIER_MAX_LEN =>
			Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN }),
		_ => Ok(()),
	}
}
