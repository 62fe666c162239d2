//! Authenticated REST call execution engine: audience-scoped token caching, pluggable
//! authentication decoration, bounded exponential retries, and tagged response outcomes for
//! generated and hand-written API clients.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod credential;
pub mod decorate;
pub mod error;
pub mod executor;
pub mod fallback;
pub mod http;
pub mod obs;
pub mod request;
pub mod retry;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

pub use cancel::CancellationToken;
pub use classify::{FieldErrors, Outcome};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use executor::{RequestExecutor, RequestExecutorBuilder};
pub use request::{Method, RequestDescriptor};
