#![cfg(feature = "test")]

// std
use std::{
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration,
};
// crates.io
use time::OffsetDateTime;
use tokio::{
	sync::Notify,
	time::{self as clock, Instant},
};
// self
use taproom::{
	_preludet::*,
	auth::{Profile, Role, Secret, UserId},
	backend::MemoryBackend,
	config::Route,
	gate::{Decision, Gate, Requirement},
	provider::{
		AuthError, DirectoryError, IdentityProvider, ProfileDirectory, ProviderFuture,
		SessionChange, SessionEvent,
	},
	session::{Session, SessionStore},
	view,
};

fn attach(backend: &Arc<MemoryBackend>) -> Arc<SessionStore> {
	SessionStore::attach(backend.clone(), backend.clone(), |task| {
		tokio::spawn(task);
	})
}

async fn wait_for(store: &SessionStore, predicate: impl Fn(&Session) -> bool) -> Session {
	let deadline = Instant::now() + Duration::from_secs(2);

	loop {
		let session = store.snapshot();

		if predicate(&session) {
			return session;
		}

		assert!(
			Instant::now() < deadline,
			"Session never reached the expected state; last snapshot: {session:?}."
		);

		clock::sleep(Duration::from_millis(5)).await;
	}
}

async fn sign_in(backend: &MemoryBackend, email: &str) -> SessionChange {
	let session = backend
		.sign_in(email, &Secret::new(PASSWORD))
		.await
		.expect("Seeded credentials should sign in.");

	SessionChange::with_session(SessionEvent::SignedIn, session)
}

/// Counts profile fetches before delegating.
struct CountingDirectory {
	inner: Arc<MemoryBackend>,
	fetches: AtomicUsize,
}
impl ProfileDirectory for CountingDirectory {
	fn fetch_profile<'a>(
		&'a self,
		id: &'a UserId,
	) -> ProviderFuture<'a, Option<Profile>, DirectoryError> {
		self.fetches.fetch_add(1, Ordering::SeqCst);

		self.inner.fetch_profile(id)
	}

	fn list_profiles(&self) -> ProviderFuture<'_, Vec<Profile>, DirectoryError> {
		self.inner.list_profiles()
	}

	fn set_role<'a>(
		&'a self,
		id: &'a UserId,
		role: Role,
		updated_at: OffsetDateTime,
	) -> ProviderFuture<'a, Profile, DirectoryError> {
		self.inner.set_role(id, role, updated_at)
	}
}

/// Holds fetches for one identity until released.
struct GatedDirectory {
	inner: Arc<MemoryBackend>,
	held: UserId,
	entered: Notify,
	release: Notify,
}
impl ProfileDirectory for GatedDirectory {
	fn fetch_profile<'a>(
		&'a self,
		id: &'a UserId,
	) -> ProviderFuture<'a, Option<Profile>, DirectoryError> {
		Box::pin(async move {
			if id == &self.held {
				self.entered.notify_one();
				self.release.notified().await;
			}

			self.inner.fetch_profile(id).await
		})
	}

	fn list_profiles(&self) -> ProviderFuture<'_, Vec<Profile>, DirectoryError> {
		self.inner.list_profiles()
	}

	fn set_role<'a>(
		&'a self,
		id: &'a UserId,
		role: Role,
		updated_at: OffsetDateTime,
	) -> ProviderFuture<'a, Profile, DirectoryError> {
		self.inner.set_role(id, role, updated_at)
	}
}

#[tokio::test]
async fn bootstrap_without_session_redirects_without_fetching_profiles() {
	let (backend, _) = seeded_backend();
	let directory =
		Arc::new(CountingDirectory { inner: backend.clone(), fetches: AtomicUsize::new(0) });
	let store = SessionStore::attach(backend.clone(), directory.clone(), |task| {
		tokio::spawn(task);
	});
	let gate = Gate::protected(Requirement::Admin);
	let navigator = RecordingNavigator::default();

	assert_eq!(gate.drive(&store.snapshot(), &navigator), Decision::Pending);

	let session = store.bootstrap().await;

	assert_eq!(session, Session::signed_out());
	assert_eq!(gate.drive(&session, &navigator), Decision::Redirect(Route::Login));
	assert_eq!(navigator.visits(), vec![Route::Login]);
	assert_eq!(directory.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn bootstrap_restores_a_persisted_session() {
	let (backend, accounts) = seeded_backend();

	backend.sign_in(SUPER_ADMIN_EMAIL, &Secret::new(PASSWORD)).await.expect("Sign-in should succeed.");

	let store = attach(&backend);
	let session = store.bootstrap().await;

	assert!(!session.loading);
	assert_eq!(session.user_id(), Some(&accounts.super_admin.id));
	assert_eq!(session.role(), Some(Role::SuperAdmin));
	assert_eq!(store.bootstrap().await, session);
	assert_eq!(store.metrics().published(), 1);
}

#[tokio::test]
async fn admin_sign_in_unlocks_admin_pages_only() {
	let (backend, accounts) = seeded_backend();
	let store = attach(&backend);

	store.bootstrap().await;

	let navigator = RecordingNavigator::default();
	let form = view::SignInForm::new(ADMIN_EMAIL, PASSWORD);
	let identity = view::sign_in(backend.as_ref(), &navigator, &form)
		.await
		.expect("Seeded credentials should sign in.");

	assert_eq!(identity, accounts.admin);
	assert_eq!(navigator.last(), Some(Route::Dashboard));

	let session = wait_for(&store, |session| session.profile.is_some()).await;
	let users_page = Gate::protected(Requirement::SuperAdmin);
	let inventory_page = Gate::protected(Requirement::Admin);

	assert_eq!(users_page.drive(&session, &navigator), Decision::Redirect(Route::Login));
	assert_eq!(inventory_page.drive(&session, &navigator), Decision::Render);
	assert_eq!(navigator.visits(), vec![Route::Dashboard, Route::Login]);
}

#[tokio::test]
async fn rejected_credentials_surface_the_provider_message() {
	let (backend, _) = seeded_backend();
	let navigator = RecordingNavigator::default();
	let form = view::SignInForm::new(ADMIN_EMAIL, "not-the-password");
	let err = view::sign_in(backend.as_ref(), &navigator, &form)
		.await
		.expect_err("Wrong passwords should be rejected.");

	assert_eq!(err.to_string(), "Invalid login credentials.");
	assert!(navigator.visits().is_empty());

	let blank = view::SignInForm::new("  ", PASSWORD);

	assert!(matches!(
		view::sign_in(backend.as_ref(), &navigator, &blank).await,
		Err(taproom::error::Error::Validation { field: "email", .. })
	));
}

#[tokio::test]
async fn late_profile_for_a_previous_identity_is_dropped() {
	let (backend, accounts) = seeded_backend();
	let directory = Arc::new(GatedDirectory {
		inner: backend.clone(),
		held: accounts.admin.id.clone(),
		entered: Notify::new(),
		release: Notify::new(),
	});
	let store = Arc::new(SessionStore::new(backend.clone(), directory.clone()));

	store.bootstrap().await;

	let first = sign_in(&backend, ADMIN_EMAIL).await;
	let stale = tokio::spawn({
		let store = store.clone();

		async move { store.handle_change(first).await }
	});

	directory.entered.notified().await;
	store.handle_change(sign_in(&backend, SUPER_ADMIN_EMAIL).await).await;

	assert_eq!(store.snapshot().user_id(), Some(&accounts.super_admin.id));

	directory.release.notify_one();
	stale.await.expect("The stale handler should finish.");

	let session = store.snapshot();

	assert_eq!(session.user_id(), Some(&accounts.super_admin.id));
	assert_eq!(session.role(), Some(Role::SuperAdmin));
	assert_eq!(store.metrics().stale_dropped(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pushed_sign_out_wins_over_an_earlier_sign_in() {
	for _ in 0..50 {
		let (backend, _) = seeded_backend();
		let store = attach(&backend);

		store.bootstrap().await;

		let provider = backend.clone();

		tokio::spawn(async move {
			provider
				.sign_in(ADMIN_EMAIL, &Secret::new(PASSWORD))
				.await
				.expect("Sign-in should succeed.");
			provider.sign_out().await.expect("Sign-out should succeed.");
		})
		.await
		.expect("The provider task should not panic.");

		// Bootstrap plus both notifications, each either published or dropped as stale.
		wait_for(&store, |_| store.metrics().published() + store.metrics().stale_dropped() == 3)
			.await;

		assert_eq!(store.snapshot(), Session::signed_out());
	}
}

#[tokio::test]
async fn cancelled_bootstrap_is_retried_by_the_next_call() {
	let (backend, accounts) = seeded_backend();
	let directory = Arc::new(GatedDirectory {
		inner: backend.clone(),
		held: accounts.super_admin.id.clone(),
		entered: Notify::new(),
		release: Notify::new(),
	});

	backend
		.sign_in(SUPER_ADMIN_EMAIL, &Secret::new(PASSWORD))
		.await
		.expect("Sign-in should succeed.");

	let store = SessionStore::new(backend.clone(), directory.clone());

	assert!(clock::timeout(Duration::from_millis(20), store.bootstrap()).await.is_err());
	assert!(store.snapshot().loading);

	directory.release.notify_one();

	let session = store.bootstrap().await;

	assert!(!session.loading);
	assert_eq!(session.role(), Some(Role::SuperAdmin));
	assert_eq!(store.metrics().published(), 1);
}

#[tokio::test]
async fn sign_out_clears_the_session_even_when_the_provider_fails() {
	let (backend, _) = seeded_backend();
	let store = attach(&backend);

	store.bootstrap().await;
	backend.sign_in(ADMIN_EMAIL, &Secret::new(PASSWORD)).await.expect("Sign-in should succeed.");
	wait_for(&store, |session| session.is_admin()).await;
	backend.fail_next_sign_out(AuthError::Backend { message: "network unreachable".into() });

	let navigator = RecordingNavigator::default();

	view::sign_out(&store, &navigator).await;

	let session = store.snapshot();

	assert!(session.identity.is_none());
	assert!(session.profile.is_none());
	assert!(!session.loading);
	assert_eq!(navigator.visits(), vec![Route::Home]);
	assert!(backend.current().is_some());
}

#[tokio::test]
async fn sign_out_after_a_successful_provider_call() {
	let (backend, _) = seeded_backend();
	let store = attach(&backend);

	store.bootstrap().await;
	backend.sign_in(SUPER_ADMIN_EMAIL, &Secret::new(PASSWORD)).await.expect("Sign-in should succeed.");
	wait_for(&store, |session| session.is_super_admin()).await;

	let navigator = RecordingNavigator::default();

	view::sign_out(&store, &navigator).await;

	assert_eq!(store.snapshot(), Session::signed_out());
	assert_eq!(navigator.last(), Some(Route::Home));
	assert!(backend.current().is_none());

	// The pushed SignedOut event must land on the same state.
	clock::sleep(Duration::from_millis(20)).await;

	assert_eq!(store.snapshot(), Session::signed_out());
}

#[tokio::test]
async fn lookup_faults_degrade_to_no_profile_and_keep_listening() {
	let (backend, accounts) = seeded_backend();
	let store = attach(&backend);

	store.bootstrap().await;
	backend.fail_profile_lookups(Some(DirectoryError::Backend { message: "timeout".into() }));
	backend.sign_in(ADMIN_EMAIL, &Secret::new(PASSWORD)).await.expect("Sign-in should succeed.");

	let session = wait_for(&store, |session| session.identity.is_some()).await;

	assert_eq!(session.user_id(), Some(&accounts.admin.id));
	assert!(session.profile.is_none());
	assert_eq!(store.metrics().lookup_faults(), 1);
	assert!(store.is_subscribed());

	backend.fail_profile_lookups(None);
	backend.refresh_session().expect("A session should be active.");

	let session = wait_for(&store, |session| session.profile.is_some()).await;

	assert_eq!(session.role(), Some(Role::Admin));
}

#[tokio::test]
async fn malformed_roles_are_treated_as_missing_profiles() {
	let (backend, accounts) = seeded_backend();

	backend.put_profile_row(
		&accounts.admin.id,
		serde_json::json!({
			"id": accounts.admin.id,
			"email": ADMIN_EMAIL,
			"role": "owner",
			"created_at": "2025-01-01T00:00:00Z",
			"updated_at": "2025-01-01T00:00:00Z",
		}),
	);
	backend.sign_in(ADMIN_EMAIL, &Secret::new(PASSWORD)).await.expect("Sign-in should succeed.");

	let store = attach(&backend);
	let session = store.bootstrap().await;
	let navigator = RecordingNavigator::default();

	assert!(session.identity.is_some());
	assert!(session.profile.is_none());
	assert_eq!(
		Gate::protected(Requirement::Admin).drive(&session, &navigator),
		Decision::Redirect(Route::Login)
	);
}

#[tokio::test]
async fn observers_see_every_published_snapshot_in_order() {
	let (backend, _) = seeded_backend();
	let store = attach(&backend);
	let seen = Arc::new(Mutex::new(Vec::new()));
	let handle = store.observe({
		let seen = seen.clone();

		move |session: &Session| seen.lock().push((session.loading, session.role()))
	});

	store.bootstrap().await;
	backend.sign_in(SUPER_ADMIN_EMAIL, &Secret::new(PASSWORD)).await.expect("Sign-in should succeed.");
	wait_for(&store, |session| session.is_super_admin()).await;
	backend.sign_out().await.expect("Sign-out should succeed.");
	wait_for(&store, |session| session.identity.is_none()).await;

	assert_eq!(*seen.lock(), vec![(false, None), (false, Some(Role::SuperAdmin)), (false, None)]);

	drop(handle);

	assert_eq!(store.observer_count(), 0);
}

#[tokio::test]
async fn teardown_releases_the_subscription() {
	let (backend, _) = seeded_backend();
	let store = attach(&backend);
	let _handle = store.observe(|_| {});

	store.bootstrap().await;

	assert_eq!(backend.listener_count(), 1);
	assert!(store.is_subscribed());

	store.teardown();
	store.teardown();

	assert_eq!(backend.listener_count(), 0);
	assert!(!store.is_subscribed());
	assert_eq!(store.observer_count(), 0);

	backend.sign_in(ADMIN_EMAIL, &Secret::new(PASSWORD)).await.expect("Sign-in should succeed.");
	clock::sleep(Duration::from_millis(20)).await;

	assert_eq!(store.snapshot(), Session::signed_out());
}

#[tokio::test]
async fn dropping_the_store_unsubscribes() {
	let (backend, _) = seeded_backend();
	let store = attach(&backend);

	assert_eq!(backend.listener_count(), 1);

	drop(store);

	assert_eq!(backend.listener_count(), 0);
}
