//! Authenticated principals and the raw sessions pushed by the identity provider.

// self
use crate::{
	_prelude::*,
	auth::{Secret, UserId},
};

/// Authenticated principal reference issued by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
	/// Principal identifier; also keys the profile row.
	pub id: UserId,
	/// Sign-in email address.
	pub email: String,
}
impl Identity {
	/// Creates an identity for the provided id and email.
	pub fn new(id: UserId, email: impl Into<String>) -> Self {
		Self { id, email: email.into() }
	}
}

/// Session material as delivered by the identity provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSession {
	/// Principal the session belongs to.
	pub identity: Identity,
	/// Bearer token for the hosted backend; redacted in formatting.
	pub access_token: Secret,
	/// Instant the token was minted.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
}
impl Debug for RawSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RawSession")
			.field("identity", &self.identity)
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.finish()
	}
}
