//! Auth-domain identifiers, secrets, access tokens, and authentication strategies.

pub mod id;
pub mod secret;
pub mod strategy;
pub mod token;

pub use id::*;
pub use secret::*;
pub use strategy::*;
pub use token::*;
