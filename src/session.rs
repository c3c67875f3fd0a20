//! Session snapshots, profile resolution, and the store that keeps them current.

pub mod resolver;
pub mod store;

mod metrics;

pub use metrics::SessionMetrics;
pub use resolver::*;
pub use store::*;

// self
use crate::{
	_prelude::*,
	auth::{Identity, Profile, Role, UserId},
};

/// Point-in-time view of who is signed in and what they may do.
///
/// Snapshots are replaced wholesale, so `profile` always belongs to `identity`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
	/// Current principal, if signed in.
	pub identity: Option<Identity>,
	/// Cached profile of `identity`; `None` when absent, malformed, or not yet known.
	pub profile: Option<Profile>,
	/// `true` only until the initial bootstrap has resolved.
	pub loading: bool,
}
impl Session {
	/// State before the bootstrap fetch resolves.
	pub fn initializing() -> Self {
		Self { identity: None, profile: None, loading: true }
	}

	/// Resolved state with nobody signed in.
	pub fn signed_out() -> Self {
		Self { identity: None, profile: None, loading: false }
	}

	/// Resolved state for `identity`, dropping a profile that belongs to someone else.
	pub fn signed_in(identity: Identity, profile: Option<Profile>) -> Self {
		let profile = profile.filter(|profile| profile.belongs_to(&identity.id));

		Self { identity: Some(identity), profile, loading: false }
	}

	/// Identifier of the signed-in principal.
	pub fn user_id(&self) -> Option<&UserId> {
		self.identity.as_ref().map(|identity| &identity.id)
	}

	/// Role from the cached profile.
	pub fn role(&self) -> Option<Role> {
		self.profile.as_ref().map(|profile| profile.role)
	}

	/// Email to display: the profile's when known, else the identity's.
	pub fn email(&self) -> Option<&str> {
		self.profile
			.as_ref()
			.map(|profile| profile.email.as_str())
			.or_else(|| self.identity.as_ref().map(|identity| identity.email.as_str()))
	}

	/// Returns `true` when the session holds either admin role.
	pub fn is_admin(&self) -> bool {
		self.role().is_some()
	}

	/// Returns `true` when the session holds [`Role::SuperAdmin`].
	pub fn is_super_admin(&self) -> bool {
		self.role().is_some_and(Role::is_super_admin)
	}
}
impl Default for Session {
	fn default() -> Self {
		Self::initializing()
	}
}
