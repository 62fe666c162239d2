//! Response classification into tagged outcomes.
//!
//! Absence (404) and field validation failures (400/422 with an `errors` object) are ordinary
//! outcomes callers branch on, not errors. Everything else that is not in the configured
//! success set becomes [`Outcome::FatalError`], which the retry policy may or may not retry.

// std
use std::collections::BTreeSet;
// self
use crate::{
	_prelude::*,
	error::{DecodeError, FatalError, TransportError},
	http::RawResponse,
	request::Method,
};

/// Field name → validation messages reported by the service.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Statuses treated as success when no explicit set is configured.
pub const DEFAULT_SUCCESS_STATUSES: [u16; 3] = [200, 201, 204];

/// Tagged result of one execution attempt.
#[derive(Debug)]
pub enum Outcome {
	/// Response status is in the success set.
	Success(RawResponse),
	/// Resource does not exist (HTTP 404).
	NotFound,
	/// Service rejected the payload with per-field messages.
	ValidationError(FieldErrors),
	/// Any other response, or no response at all.
	FatalError(FatalError),
}
impl Outcome {
	/// Returns `true` for [`Outcome::Success`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success(_))
	}

	/// Returns `true` for [`Outcome::NotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound)
	}

	/// Successful response, if any.
	pub fn success(&self) -> Option<&RawResponse> {
		match self {
			Self::Success(response) => Some(response),
			_ => None,
		}
	}

	/// Field errors, if the outcome is a validation failure.
	pub fn field_errors(&self) -> Option<&FieldErrors> {
		match self {
			Self::ValidationError(errors) => Some(errors),
			_ => None,
		}
	}

	/// Decodes a successful body as JSON; absence and validation failures yield `None`.
	///
	/// A fatal outcome is returned as an error.
	pub fn into_json<T>(self) -> Result<Option<T>>
	where
		T: serde::de::DeserializeOwned,
	{
		match self {
			Self::Success(response) => Ok(Some(response.json()?)),
			Self::NotFound | Self::ValidationError(_) => Ok(None),
			Self::FatalError(err) => Err(err.into()),
		}
	}

	/// Stable label suitable for span or metric fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Success(_) => "success",
			Self::NotFound => "not_found",
			Self::ValidationError(_) => "validation_error",
			Self::FatalError(_) => "fatal_error",
		}
	}
}

#[derive(Deserialize)]
struct ValidationProblem {
	errors: FieldErrors,
}

/// Maps raw transport results onto [`Outcome`] values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseClassifier {
	success: BTreeSet<u16>,
}
impl ResponseClassifier {
	/// Creates a classifier with a custom success set.
	pub fn new<I>(success: I) -> Self
	where
		I: IntoIterator<Item = u16>,
	{
		Self { success: success.into_iter().collect() }
	}

	/// Statuses considered successful.
	pub fn success_statuses(&self) -> impl Iterator<Item = u16> + '_ {
		self.success.iter().copied()
	}

	/// Classifies a received response.
	pub fn classify(&self, method: Method, response: RawResponse) -> Outcome {
		let status = response.status;

		if method == Method::Head && status == 200 {
			return Outcome::Success(RawResponse { body: Vec::new(), ..response });
		}
		if self.success.contains(&status) {
			return Outcome::Success(response);
		}

		match status {
			404 => Outcome::NotFound,
			400 | 422 => match parse_field_errors(&response.body) {
				Ok(errors) => Outcome::ValidationError(errors),
				Err(err) => Outcome::FatalError(
					FatalError::from_status(status, body_message(&response)).with_source(err),
				),
			},
			_ => Outcome::FatalError(FatalError::from_status(status, body_message(&response))),
		}
	}

	/// Classifies a transport failure that produced no response.
	pub fn classify_transport_error(&self, err: TransportError) -> Outcome {
		Outcome::FatalError(FatalError::without_response(err.to_string(), err))
	}
}
impl Default for ResponseClassifier {
	fn default() -> Self {
		Self::new(DEFAULT_SUCCESS_STATUSES)
	}
}

fn parse_field_errors(body: &[u8]) -> Result<FieldErrors, DecodeError> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let problem: ValidationProblem = serde_path_to_error::deserialize(&mut deserializer)?;

	Ok(problem.errors)
}

fn body_message(response: &RawResponse) -> String {
	if response.body.is_empty() { "empty response body".into() } else { response.text() }
}
