//! Thread-safe in-memory backend implementing the identity, profile, and catalog contracts.
//!
//! Profile rows are kept as raw JSON and decoded on every read, so tests can plant malformed rows
//! with [`MemoryBackend::put_profile_row`]. Session changes are pushed to subscribers after the
//! state lock is released, on the calling task.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{BeerId, Identity, Profile, RawSession, Role, Secret, SizeId, UserId},
	backend::{self, PasswordDigest},
	catalog::{
		Beer, BeerDraft, BeerPatch, BeerSize, CatalogError, CatalogFuture, CatalogStore, SizeDraft,
		SizePatch,
	},
	obs::{self, OpKind},
	provider::{
		AuthError, DirectoryError, IdentityProvider, ProfileDirectory, ProviderFuture,
		SessionChange, SessionEvent, SessionListener, Subscription, decode_row,
	},
};

/// Minimum password length enforced at account creation.
pub const PROVIDER_MIN_PASSWORD_LEN: usize = 6;

type ListenerMap = Arc<Mutex<BTreeMap<u64, SessionListener>>>;

struct Account {
	identity: Identity,
	password: PasswordDigest,
}

#[derive(Default)]
struct State {
	accounts: BTreeMap<String, Account>,
	profiles: BTreeMap<UserId, Value>,
	beers: Vec<Beer>,
	sizes: Vec<BeerSize>,
	session: Option<RawSession>,
	last_stamp: Option<OffsetDateTime>,
	sign_out_fault: Option<AuthError>,
	profile_fault: Option<DirectoryError>,
	catalog_fault: Option<CatalogError>,
}
impl State {
	// Account timestamps are strictly increasing so "newest first" is deterministic.
	fn stamp(&mut self) -> OffsetDateTime {
		let now = OffsetDateTime::now_utc();
		let now = match self.last_stamp {
			Some(last) if now <= last => last + Duration::microseconds(1),
			_ => now,
		};

		self.last_stamp = Some(now);

		now
	}

	fn create_account(&mut self, email: &str, password: &Secret) -> Result<Identity, AuthError> {
		let key = email.trim().to_lowercase();

		if self.accounts.contains_key(&key) {
			return Err(AuthError::EmailTaken { email: email.trim().to_owned() });
		}
		if password.char_count() < PROVIDER_MIN_PASSWORD_LEN {
			return Err(AuthError::WeakPassword { min: PROVIDER_MIN_PASSWORD_LEN });
		}

		let id = UserId::new(backend::row_id("usr"))
			.map_err(|err| AuthError::Backend { message: err.to_string() })?;
		let identity = Identity::new(id, email.trim());
		let at = self.stamp();
		// New accounts start as plain admins; role changes go through `set_role`.
		let profile = Profile::new(identity.id.clone(), identity.email.clone(), Role::Admin, at);
		let row = serde_json::to_value(&profile)
			.map_err(|err| AuthError::Backend { message: err.to_string() })?;

		self.profiles.insert(identity.id.clone(), row);
		self.accounts.insert(
			key,
			Account { identity: identity.clone(), password: PasswordDigest::new(password) },
		);

		Ok(identity)
	}

	fn set_role(
		&mut self,
		id: &UserId,
		role: Role,
		updated_at: OffsetDateTime,
	) -> Result<Profile, DirectoryError> {
		let row = self
			.profiles
			.get(id)
			.cloned()
			.ok_or_else(|| DirectoryError::NotFound { id: id.to_string() })?;
		let mut profile = decode_row::<Profile>(row)?;

		profile.role = role;
		profile.updated_at = updated_at;

		let row = serde_json::to_value(&profile)
			.map_err(|err| DirectoryError::Backend { message: err.to_string() })?;

		self.profiles.insert(id.clone(), row);

		Ok(profile)
	}

	fn check_catalog(&self) -> Result<(), CatalogError> {
		match &self.catalog_fault {
			Some(fault) => Err(fault.clone()),
			None => Ok(()),
		}
	}

	fn beer_mut(&mut self, id: &BeerId) -> Result<&mut Beer, CatalogError> {
		self.beers
			.iter_mut()
			.find(|beer| &beer.id == id)
			.ok_or_else(|| CatalogError::BeerNotFound { id: id.to_string() })
	}

	fn size_mut(&mut self, id: &SizeId) -> Result<&mut BeerSize, CatalogError> {
		self.sizes
			.iter_mut()
			.find(|size| &size.id == id)
			.ok_or_else(|| CatalogError::SizeNotFound { id: id.to_string() })
	}
}

/// In-process stand-in for the hosted auth, `profiles`, `beers`, and `beer_sizes` services.
#[derive(Default)]
pub struct MemoryBackend {
	state: Arc<Mutex<State>>,
	listeners: ListenerMap,
	next_listener: AtomicU64,
}
impl MemoryBackend {
	/// Registers an account synchronously, for seeding.
	///
	/// `role: None` removes the profile row, leaving an authenticated user without privileges.
	pub fn register_user(
		&self,
		email: &str,
		password: &Secret,
		role: Option<Role>,
	) -> Result<Identity, AuthError> {
		let mut state = self.state.lock();
		let identity = state.create_account(email, password)?;

		match role {
			Some(role) => {
				let at = state.stamp();

				state
					.set_role(&identity.id, role, at)
					.map_err(|err| AuthError::Backend { message: err.to_string() })?;
			},
			None => {
				state.profiles.remove(&identity.id);
			},
		}

		Ok(identity)
	}

	/// Replaces the raw profile row stored for `id`.
	pub fn put_profile_row(&self, id: &UserId, row: Value) {
		self.state.lock().profiles.insert(id.clone(), row);
	}

	/// Deletes the profile row stored for `id`, returning whether one existed.
	pub fn remove_profile(&self, id: &UserId) -> bool {
		self.state.lock().profiles.remove(id).is_some()
	}

	/// Rotates the current access token and pushes [`SessionEvent::TokenRefreshed`].
	pub fn refresh_session(&self) -> Option<RawSession> {
		let refreshed = {
			let mut state = self.state.lock();
			let session = state.session.as_mut()?;

			session.access_token = backend::access_token();
			session.issued_at = OffsetDateTime::now_utc();

			session.clone()
		};

		self.emit(SessionChange::with_session(SessionEvent::TokenRefreshed, refreshed.clone()));

		Some(refreshed)
	}

	/// Pushes an arbitrary change to every subscriber without touching backend state.
	pub fn push_change(&self, change: SessionChange) {
		self.emit(change);
	}

	/// Session a reload would restore.
	pub fn current(&self) -> Option<RawSession> {
		self.state.lock().session.clone()
	}

	/// Number of attached listeners.
	pub fn listener_count(&self) -> usize {
		self.listeners.lock().len()
	}

	/// Makes the next [`IdentityProvider::sign_out`] fail with `fault` and keep the session.
	pub fn fail_next_sign_out(&self, fault: AuthError) {
		self.state.lock().sign_out_fault = Some(fault);
	}

	/// Makes every profile fetch fail with `fault`; `None` restores normal lookups.
	pub fn fail_profile_lookups(&self, fault: Option<DirectoryError>) {
		self.state.lock().profile_fault = fault;
	}

	/// Makes every catalog call fail with `fault`; `None` restores normal access.
	pub fn fail_catalog(&self, fault: Option<CatalogError>) {
		self.state.lock().catalog_fault = fault;
	}

	fn emit(&self, change: SessionChange) {
		let listeners = self.listeners.lock().values().cloned().collect::<Vec<_>>();

		for listener in listeners {
			listener(change.clone());
		}
	}

	fn sign_in_now(&self, email: &str, password: &Secret) -> Result<RawSession, AuthError> {
		let mut state = self.state.lock();
		let identity = state
			.accounts
			.get(&email.trim().to_lowercase())
			.filter(|account| account.password.verify(password))
			.map(|account| account.identity.clone())
			.ok_or(AuthError::InvalidCredentials)?;
		let session = RawSession {
			identity,
			access_token: backend::access_token(),
			issued_at: OffsetDateTime::now_utc(),
		};

		state.session = Some(session.clone());

		Ok(session)
	}

	fn sign_out_now(&self) -> Result<(), AuthError> {
		let mut state = self.state.lock();

		if let Some(fault) = state.sign_out_fault.take() {
			return Err(fault);
		}

		state.session = None;

		Ok(())
	}

	fn fetch_profile_now(&self, id: &UserId) -> Result<Option<Profile>, DirectoryError> {
		let row = {
			let state = self.state.lock();

			if let Some(fault) = &state.profile_fault {
				return Err(fault.clone());
			}

			state.profiles.get(id).cloned()
		};

		row.map(decode_row::<Profile>).transpose()
	}

	fn list_profiles_now(&self) -> Result<Vec<Profile>, DirectoryError> {
		let rows = self.state.lock().profiles.values().cloned().collect::<Vec<_>>();
		let profiles = rows
			.into_iter()
			.filter_map(|row| match decode_row::<Profile>(row) {
				Ok(profile) => Some(profile),
				Err(err) => {
					obs::report_degraded(OpKind::ProfileLookup, &err);

					None
				},
			})
			.collect();

		Ok(profiles)
	}

	fn insert_beer_now(&self, draft: BeerDraft, at: OffsetDateTime) -> Result<Beer, CatalogError> {
		let mut state = self.state.lock();

		state.check_catalog()?;

		let id = BeerId::new(backend::row_id("beer"))
			.map_err(|err| CatalogError::Backend { message: err.to_string() })?;
		let BeerDraft { name, style, abv, description, image_url } = draft;
		let beer = Beer {
			id,
			name,
			style,
			abv,
			description,
			image_url,
			is_active: true,
			created_at: at,
			updated_at: at,
		};

		state.beers.push(beer.clone());

		Ok(beer)
	}

	fn update_beer_now(
		&self,
		id: &BeerId,
		patch: BeerPatch,
		at: OffsetDateTime,
	) -> Result<Beer, CatalogError> {
		let mut state = self.state.lock();

		state.check_catalog()?;

		let beer = state.beer_mut(id)?;

		patch.apply(beer);
		beer.updated_at = at;

		Ok(beer.clone())
	}

	fn insert_size_now(&self, draft: SizeDraft, at: OffsetDateTime) -> Result<BeerSize, CatalogError> {
		let mut state = self.state.lock();

		state.check_catalog()?;
		state.beer_mut(&draft.beer_id)?;

		let id = SizeId::new(backend::row_id("size"))
			.map_err(|err| CatalogError::Backend { message: err.to_string() })?;
		let SizeDraft { beer_id, size_name, price, stock_quantity } = draft;
		let size = BeerSize {
			id,
			beer_id,
			size_name,
			price,
			stock_quantity,
			is_active: true,
			created_at: at,
			updated_at: at,
		};

		state.sizes.push(size.clone());

		Ok(size)
	}

	fn update_size_now(
		&self,
		id: &SizeId,
		patch: SizePatch,
		at: OffsetDateTime,
	) -> Result<BeerSize, CatalogError> {
		let mut state = self.state.lock();

		state.check_catalog()?;

		let size = state.size_mut(id)?;

		patch.apply(size);
		size.updated_at = at;

		Ok(size.clone())
	}
}
impl IdentityProvider for MemoryBackend {
	fn sign_in<'a>(
		&'a self,
		email: &'a str,
		password: &'a Secret,
	) -> ProviderFuture<'a, RawSession, AuthError> {
		Box::pin(async move {
			let session = self.sign_in_now(email, password)?;

			self.emit(SessionChange::with_session(SessionEvent::SignedIn, session.clone()));

			Ok(session)
		})
	}

	fn sign_out(&self) -> ProviderFuture<'_, (), AuthError> {
		Box::pin(async move {
			self.sign_out_now()?;
			self.emit(SessionChange::signed_out());

			Ok(())
		})
	}

	fn current_session(&self) -> ProviderFuture<'_, Option<RawSession>, AuthError> {
		Box::pin(async move { Ok(self.current()) })
	}

	fn subscribe(&self, listener: SessionListener) -> Subscription {
		let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
		let listeners = self.listeners.clone();

		listeners.lock().insert(id, listener);

		Subscription::new(move || {
			listeners.lock().remove(&id);
		})
	}

	fn create_user<'a>(
		&'a self,
		email: &'a str,
		password: &'a Secret,
	) -> ProviderFuture<'a, Identity, AuthError> {
		Box::pin(async move { self.state.lock().create_account(email, password) })
	}
}
impl ProfileDirectory for MemoryBackend {
	fn fetch_profile<'a>(
		&'a self,
		id: &'a UserId,
	) -> ProviderFuture<'a, Option<Profile>, DirectoryError> {
		Box::pin(async move { self.fetch_profile_now(id) })
	}

	fn list_profiles(&self) -> ProviderFuture<'_, Vec<Profile>, DirectoryError> {
		Box::pin(async move { self.list_profiles_now() })
	}

	fn set_role<'a>(
		&'a self,
		id: &'a UserId,
		role: Role,
		updated_at: OffsetDateTime,
	) -> ProviderFuture<'a, Profile, DirectoryError> {
		Box::pin(async move { self.state.lock().set_role(id, role, updated_at) })
	}
}
impl CatalogStore for MemoryBackend {
	fn list_beers(&self) -> CatalogFuture<'_, Vec<Beer>> {
		Box::pin(async move {
			let state = self.state.lock();

			state.check_catalog()?;

			Ok(state.beers.clone())
		})
	}

	fn list_sizes<'a>(&'a self, beer: &'a BeerId) -> CatalogFuture<'a, Vec<BeerSize>> {
		Box::pin(async move {
			let state = self.state.lock();

			state.check_catalog()?;

			Ok(state.sizes.iter().filter(|size| &size.beer_id == beer).cloned().collect())
		})
	}

	fn fetch_beer<'a>(&'a self, id: &'a BeerId) -> CatalogFuture<'a, Option<Beer>> {
		Box::pin(async move {
			let state = self.state.lock();

			state.check_catalog()?;

			Ok(state.beers.iter().find(|beer| &beer.id == id).cloned())
		})
	}

	fn insert_beer(&self, draft: BeerDraft, at: OffsetDateTime) -> CatalogFuture<'_, Beer> {
		Box::pin(async move { self.insert_beer_now(draft, at) })
	}

	fn update_beer<'a>(
		&'a self,
		id: &'a BeerId,
		patch: BeerPatch,
		at: OffsetDateTime,
	) -> CatalogFuture<'a, Beer> {
		Box::pin(async move { self.update_beer_now(id, patch, at) })
	}

	fn insert_size(&self, draft: SizeDraft, at: OffsetDateTime) -> CatalogFuture<'_, BeerSize> {
		Box::pin(async move { self.insert_size_now(draft, at) })
	}

	fn update_size<'a>(
		&'a self,
		id: &'a SizeId,
		patch: SizePatch,
		at: OffsetDateTime,
	) -> CatalogFuture<'a, BeerSize> {
		Box::pin(async move { self.update_size_now(id, patch, at) })
	}
}
impl Debug for MemoryBackend {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("MemoryBackend")
			.field("accounts", &state.accounts.len())
			.field("profiles", &state.profiles.len())
			.field("beers", &state.beers.len())
			.field("signed_in", &state.session.is_some())
			.finish()
	}
}
