//! Super-admin account management.
//!
//! Every operation checks the caller's [`Session`] against [`Requirement::SuperAdmin`] before it
//! touches a collaborator. Account creation is a two-step write (identity, then role) and is
//! serialized per email address so two submissions of the same form cannot interleave.

// self
use crate::{
	_prelude::*,
	auth::{Profile, Role, Secret, UserId},
	config::Settings,
	gate::{self, Requirement},
	obs::{self, OpKind, OpOutcome, OpSpan},
	provider::{IdentityProvider, ProfileDirectory},
	session::Session,
};

/// Values submitted by the "create user" form.
#[derive(Clone, Debug)]
pub struct NewUser {
	/// Email address of the new account.
	pub email: String,
	/// Initial password.
	pub password: Secret,
	/// Role assigned once the account exists.
	pub role: Role,
}
impl NewUser {
	/// Creates a form submission.
	pub fn new(email: impl Into<String>, password: impl Into<Secret>, role: Role) -> Self {
		Self { email: email.into(), password: password.into(), role }
	}
}

/// Account listing, creation, and role changes.
pub struct UserAdmin {
	identity: Arc<dyn IdentityProvider>,
	directory: Arc<dyn ProfileDirectory>,
	settings: Settings,
	creation_guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}
impl UserAdmin {
	/// Creates the service over the identity and profile collaborators.
	pub fn new(
		identity: Arc<dyn IdentityProvider>,
		directory: Arc<dyn ProfileDirectory>,
		settings: Settings,
	) -> Self {
		Self { identity, directory, settings, creation_guards: Default::default() }
	}

	/// Every profile, newest first.
	pub async fn list_users(&self, session: &Session) -> Result<Vec<Profile>> {
		self.run("list_users", session, async move {
			let mut profiles = self.directory.list_profiles().await?;

			profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));

			Ok(profiles)
		})
		.await
	}

	/// Creates a confirmed account and assigns its role.
	///
	/// Provider rejections (taken email, weak password) come back as [`Error::Auth`] with a
	/// message suitable for the form.
	pub async fn create_user(&self, session: &Session, user: NewUser) -> Result<Profile> {
		self.run("create_user", session, async move {
			let NewUser { email, password, role } = user;
			let email = email.trim();

			if email.is_empty() || !email.contains('@') {
				return Err(Error::validation("email", "a valid email address is required"));
			}
			if password.char_count() < self.settings.min_password_len {
				return Err(Error::validation(
					"password",
					format!("must be at least {} characters", self.settings.min_password_len),
				));
			}

			let lease = self.creation_lease(email);
			let _serialized = lease.guard.lock().await;
			let identity = self.identity.create_user(email, &password).await?;
			let profile =
				self.directory.set_role(&identity.id, role, OffsetDateTime::now_utc()).await?;

			obs::report_event(OpKind::UserAdmin, "account created");

			Ok(profile)
		})
		.await
	}

	/// Changes the role on an existing profile and bumps its `updated_at`.
	pub async fn update_role(&self, session: &Session, id: &UserId, role: Role) -> Result<Profile> {
		self.run("update_role", session, async move {
			Ok(self.directory.set_role(id, role, OffsetDateTime::now_utc()).await?)
		})
		.await
	}

	async fn run<T, F>(&self, stage: &'static str, session: &Session, op: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		const KIND: OpKind = OpKind::UserAdmin;

		let span = OpSpan::new(KIND, stage);

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = match gate::authorize(session, Requirement::SuperAdmin) {
			Ok(()) => span.instrument(op).await,
			Err(err) => Err(err),
		};

		obs::record_result(KIND, result)
	}

	fn creation_lease(&self, email: &str) -> CreationLease<'_> {
		let key = email.to_lowercase();
		let guard = self
			.creation_guards
			.lock()
			.entry(key.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(())))
			.clone();

		CreationLease { guards: &self.creation_guards, key, guard }
	}
}
impl Debug for UserAdmin {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserAdmin").field("settings", &self.settings).finish_non_exhaustive()
	}
}

/// Shared per-email guard; the map entry goes away with the last lease.
struct CreationLease<'a> {
	guards: &'a Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
	key: String,
	guard: Arc<AsyncMutex<()>>,
}
impl Drop for CreationLease<'_> {
	fn drop(&mut self) {
		let mut guards = self.guards.lock();

		// One reference in the map plus this lease; clones are only made under the map lock.
		if Arc::strong_count(&self.guard) == 2 {
			guards.remove(&self.key);
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, auth::Identity};

	fn session_for(identity: &Identity, role: Role) -> Session {
		let profile =
			Profile::new(identity.id.clone(), identity.email.clone(), role, OffsetDateTime::now_utc());

		Session::signed_in(identity.clone(), Some(profile))
	}

	#[tokio::test]
	async fn guards_are_shared_per_email_and_released_with_the_last_lease() {
		let (backend, _) = seeded_backend();
		let admin = UserAdmin::new(backend.clone(), backend, Settings::default());
		let first = admin.creation_lease("New@Example.com");
		let second = admin.creation_lease("new@example.com");

		assert!(Arc::ptr_eq(&first.guard, &second.guard));
		assert!(!Arc::ptr_eq(&first.guard, &admin.creation_lease("other@example.com").guard));
		assert_eq!(admin.creation_guards.lock().len(), 1);

		drop(first);

		assert_eq!(admin.creation_guards.lock().len(), 1);

		drop(second);

		assert!(admin.creation_guards.lock().is_empty());
	}

	#[tokio::test]
	async fn finished_creations_leave_no_guards_behind() {
		let (backend, accounts) = seeded_backend();
		let admin = UserAdmin::new(backend.clone(), backend.clone(), Settings::default());
		let session = session_for(&accounts.super_admin, Role::SuperAdmin);

		admin
			.create_user(&session, NewUser::new("new@example.com", PASSWORD, Role::Admin))
			.await
			.expect("Account creation should succeed.");
		admin
			.create_user(&session, NewUser::new("new@example.com", PASSWORD, Role::Admin))
			.await
			.expect_err("Duplicate emails should be rejected.");

		assert!(admin.creation_guards.lock().is_empty());
	}

	#[tokio::test]
	async fn short_passwords_never_reach_the_provider() {
		let (backend, accounts) = seeded_backend();
		let admin = UserAdmin::new(backend.clone(), backend.clone(), Settings::default());
		let session = session_for(&accounts.super_admin, Role::SuperAdmin);
		let err = admin
			.create_user(&session, NewUser::new("new@example.com", "12345", Role::Admin))
			.await
			.expect_err("Five-character passwords should be rejected.");

		assert!(matches!(err, Error::Validation { field: "password", .. }));
		assert_eq!(
			admin.list_users(&session).await.expect("Listing should succeed.").len(),
			2
		);
	}

	#[tokio::test]
	async fn admins_are_forbidden() {
		let (backend, accounts) = seeded_backend();
		let admin = UserAdmin::new(backend.clone(), backend, Settings::default());
		let session = session_for(&accounts.admin, Role::Admin);
		let err = admin.list_users(&session).await.expect_err("Admins cannot list users.");

		assert!(matches!(err, Error::Forbidden { required: Requirement::SuperAdmin }));
	}
}
