//! Crate-level error types shared by the session, catalog, and administration layers.

// self
use crate::{_prelude::*, gate::Requirement};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Identity provider rejected or failed an authentication call.
	#[error(transparent)]
	Auth(#[from] crate::provider::AuthError),
	/// Profile directory failure.
	#[error(transparent)]
	Directory(#[from] crate::provider::DirectoryError),
	/// Catalog storage failure.
	#[error("{0}")]
	Catalog(
		#[from]
		#[source]
		crate::catalog::CatalogError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The current session does not carry the privilege the operation requires.
	#[error("Session lacks the {required} privilege.")]
	Forbidden {
		/// Privilege the operation asked for.
		required: Requirement,
	},
	/// Caller-supplied input failed validation before reaching the backend.
	#[error("The {field} field is invalid: {reason}.")]
	Validation {
		/// Form field that failed validation.
		field: &'static str,
		/// Human-readable reason.
		reason: String,
	},
}
impl Error {
	pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
		Self::Validation { field, reason: reason.into() }
	}
}

/// Configuration and validation failures raised while loading settings.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Settings file could not be read.
	#[error("Settings file could not be read.")]
	Read(#[from] std::io::Error),
	/// Settings document is not valid JSON or does not match the schema.
	#[error("Settings document is malformed.")]
	Parse {
		/// Structured parsing failure pointing at the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A route path does not start with `/`.
	#[error("Route `{route}` has an invalid path `{path}`.")]
	InvalidRoutePath {
		/// Route label.
		route: &'static str,
		/// Offending path.
		path: String,
	},
	/// Two routes resolve to the same path.
	#[error("Routes `{first}` and `{second}` share the path `{path}`.")]
	DuplicateRoutePath {
		/// First route label.
		first: &'static str,
		/// Second route label.
		second: &'static str,
		/// Shared path.
		path: String,
	},
	/// A numeric limit is out of range.
	#[error("Setting `{name}` is out of range.")]
	OutOfRange {
		/// Setting name.
		name: &'static str,
	},
}
