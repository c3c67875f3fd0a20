//! Collaborator contracts for the hosted identity and profile services.
//!
//! The crate never talks to the network itself. Callers provide an [`IdentityProvider`] (sign-in,
//! sign-out, session push notifications, privileged user creation) and a [`ProfileDirectory`]
//! (role records). Both traits hand back boxed `Send` futures so implementations can wrap any
//! async client, and [`crate::backend::MemoryBackend`] implements them in-process.

// self
use crate::{
	_prelude::*,
	auth::{Identity, Profile, RawSession, Role, Secret, UserId},
};

/// Boxed future returned by collaborator calls.
pub type ProviderFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// Callback invoked by the identity provider for every session change.
pub type SessionListener = Arc<dyn Fn(SessionChange) + Send + Sync>;

/// Identity service used for authentication and account provisioning.
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	/// Exchanges email + password for a session. Emits [`SessionEvent::SignedIn`] on success.
	fn sign_in<'a>(
		&'a self,
		email: &'a str,
		password: &'a Secret,
	) -> ProviderFuture<'a, RawSession, AuthError>;

	/// Ends the current session. Emits [`SessionEvent::SignedOut`] on success.
	fn sign_out(&self) -> ProviderFuture<'_, (), AuthError>;

	/// Returns the session persisted from a previous visit, if any.
	fn current_session(&self) -> ProviderFuture<'_, Option<RawSession>, AuthError>;

	/// Registers a listener for session changes. Dropping the [`Subscription`] detaches it.
	fn subscribe(&self, listener: SessionListener) -> Subscription;

	/// Creates a confirmed account without signing it in.
	fn create_user<'a>(
		&'a self,
		email: &'a str,
		password: &'a Secret,
	) -> ProviderFuture<'a, Identity, AuthError>;
}

/// Role record lookups and updates (`profiles` table).
pub trait ProfileDirectory
where
	Self: Send + Sync,
{
	/// Fetches the profile keyed by `id`; `Ok(None)` when no row exists.
	fn fetch_profile<'a>(&'a self, id: &'a UserId)
	-> ProviderFuture<'a, Option<Profile>, DirectoryError>;

	/// Lists every profile row in storage order.
	fn list_profiles(&self) -> ProviderFuture<'_, Vec<Profile>, DirectoryError>;

	/// Sets the role on an existing profile and stamps `updated_at`.
	fn set_role<'a>(
		&'a self,
		id: &'a UserId,
		role: Role,
		updated_at: OffsetDateTime,
	) -> ProviderFuture<'a, Profile, DirectoryError>;
}

/// Kind of change reported by the identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionEvent {
	/// A user signed in.
	SignedIn,
	/// The current user signed out.
	SignedOut,
	/// The access token was rotated for the same user.
	TokenRefreshed,
	/// Account details of the current user changed.
	UserUpdated,
}
impl SessionEvent {
	/// Returns a stable label suitable for span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionEvent::SignedIn => "signed_in",
			SessionEvent::SignedOut => "signed_out",
			SessionEvent::TokenRefreshed => "token_refreshed",
			SessionEvent::UserUpdated => "user_updated",
		}
	}
}

/// Payload delivered to a [`SessionListener`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionChange {
	/// What happened.
	pub event: SessionEvent,
	/// Session after the change; `None` once signed out.
	pub session: Option<RawSession>,
}
impl SessionChange {
	/// Builds a change for a sign-in or refresh carrying `session`.
	pub fn with_session(event: SessionEvent, session: RawSession) -> Self {
		Self { event, session: Some(session) }
	}

	/// Builds a [`SessionEvent::SignedOut`] change.
	pub fn signed_out() -> Self {
		Self { event: SessionEvent::SignedOut, session: None }
	}
}

/// Registration handle returned by [`IdentityProvider::subscribe`].
///
/// The detach hook runs at most once, on [`Subscription::unsubscribe`] or on drop.
pub struct Subscription(Mutex<Option<Box<dyn FnOnce() + Send>>>);
impl Subscription {
	/// Wraps the provider-side detach hook.
	pub fn new(detach: impl 'static + FnOnce() + Send) -> Self {
		Self(Mutex::new(Some(Box::new(detach))))
	}

	/// Detaches the listener. Later calls are no-ops.
	pub fn unsubscribe(&self) {
		let detach = self.0.lock().take();

		if let Some(detach) = detach {
			detach();
		}
	}

	/// Returns `true` until the listener has been detached.
	pub fn is_active(&self) -> bool {
		self.0.lock().is_some()
	}
}
impl Drop for Subscription {
	fn drop(&mut self) {
		self.unsubscribe();
	}
}
impl Debug for Subscription {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Subscription").field("active", &self.is_active()).finish()
	}
}

/// Failures reported by an [`IdentityProvider`].
///
/// Display strings are shown to the user verbatim on the sign-in and user-creation forms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AuthError {
	/// Email/password pair was rejected.
	#[error("Invalid login credentials.")]
	InvalidCredentials,
	/// Account creation collided with an existing email.
	#[error("A user with the email address {email} has already been registered.")]
	EmailTaken {
		/// Colliding address.
		email: String,
	},
	/// Password does not meet the provider's strength rule.
	#[error("Password should be at least {min} characters.")]
	WeakPassword {
		/// Minimum accepted length.
		min: usize,
	},
	/// Provider-side failure.
	#[error("Identity provider failure: {message}.")]
	Backend {
		/// Provider-supplied message.
		message: String,
	},
}

/// Failures reported by a [`ProfileDirectory`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum DirectoryError {
	/// No profile row exists for the identifier.
	#[error("No profile exists for user {id}.")]
	NotFound {
		/// Requested identifier.
		id: String,
	},
	/// Row exists but does not decode into a [`Profile`].
	#[error("Profile row is malformed at `{path}`: {message}.")]
	Malformed {
		/// Path of the offending field.
		path: String,
		/// Decoder message.
		message: String,
	},
	/// Backend-level failure.
	#[error("Profile directory failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Decodes a JSON row, reporting the path of the first field that fails.
pub fn decode_row<T>(row: serde_json::Value) -> Result<T, DirectoryError>
where
	T: serde::de::DeserializeOwned,
{
	serde_path_to_error::deserialize(row).map_err(|err| DirectoryError::Malformed {
		path: err.path().to_string(),
		message: err.inner().to_string(),
	})
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[test]
	fn subscription_detaches_once() {
		let detached = Arc::new(AtomicUsize::new(0));
		let counter = detached.clone();
		let subscription = Subscription::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		assert!(subscription.is_active());

		subscription.unsubscribe();
		subscription.unsubscribe();

		assert!(!subscription.is_active());

		drop(subscription);

		assert_eq!(detached.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn dropping_a_subscription_detaches() {
		let detached = Arc::new(AtomicUsize::new(0));
		let counter = detached.clone();

		drop(Subscription::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		}));

		assert_eq!(detached.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn decode_row_reports_the_failing_path() {
		let row = serde_json::json!({
			"id": "usr_1",
			"email": "admin@example.com",
			"role": "viewer",
			"created_at": "2025-01-01T00:00:00Z",
			"updated_at": "2025-01-01T00:00:00Z",
		});
		let err = decode_row::<Profile>(row).expect_err("Unknown roles should not decode.");

		assert!(matches!(err, DirectoryError::Malformed { ref path, .. } if path == "role"));
	}
}
