//! Optional observability helpers for session, gate, and admin operations.
//!
//! # Feature Flags
//!
//! - `tracing` (default) emits spans named `taproom.op` with the `op` and `stage` fields, plus
//!   warn-level events for faults the crate degrades silently (profile lookups, sign-out).
//! - `metrics` increments the `taproom_op_total` counter for every attempt/success/failure,
//!   labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Initial session + profile fetch.
	Bootstrap,
	/// Handling of a pushed identity change.
	SessionChange,
	/// Profile fetch for an identity.
	ProfileLookup,
	/// Email + password sign-in.
	SignIn,
	/// Best-effort sign-out.
	SignOut,
	/// Catalog mutation.
	Inventory,
	/// Account listing, creation, or role change.
	UserAdmin,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Bootstrap => "bootstrap",
			OpKind::SessionChange => "session_change",
			OpKind::ProfileLookup => "profile_lookup",
			OpKind::SignIn => "sign_in",
			OpKind::SignOut => "sign_out",
			OpKind::Inventory => "inventory",
			OpKind::UserAdmin => "user_admin",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller or degraded locally.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
