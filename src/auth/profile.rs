//! Privilege records keyed by identity.

// self
use crate::{
	_prelude::*,
	auth::{Role, UserId},
};

/// Privilege record associated with an identity (`profiles` table row).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
	/// Matches [`crate::auth::Identity::id`].
	pub id: UserId,
	/// Email copied from the identity at creation time.
	pub email: String,
	/// Privilege level.
	pub role: Role,
	/// Row creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	/// Last modification instant.
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl Profile {
	/// Creates a profile whose timestamps are both `at`.
	pub fn new(id: UserId, email: impl Into<String>, role: Role, at: OffsetDateTime) -> Self {
		Self { id, email: email.into(), role, created_at: at, updated_at: at }
	}

	/// Returns `true` when the profile belongs to `id`.
	pub fn belongs_to(&self, id: &UserId) -> bool {
		&self.id == id
	}
}
