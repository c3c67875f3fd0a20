//! The session store: single writer of [`Session`] state.
//!
//! A store is created explicitly, bootstrapped once, and then fed by identity-provider change
//! notifications. Every bootstrap or change takes a ticket before it suspends on the profile
//! fetch; the derived snapshot is published only if its ticket is still the latest one, so a
//! slow fetch for a previous identity can never overwrite a newer state. Subscribed stores take
//! the ticket inside the provider callback, before the work is spawned, so tickets follow the
//! order in which notifications arrive. Observers receive snapshots in ticket order.

// std
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
// crates.io
use parking_lot::RwLockWriteGuard;
// self
use crate::{
	_prelude::*,
	auth::Identity,
	obs::{self, OpKind, OpOutcome, OpSpan},
	provider::{IdentityProvider, ProfileDirectory, SessionChange, SessionListener, Subscription},
	session::{ProfileResolver, Session, SessionMetrics},
};

/// Detached unit of work handed to a [`SessionStore`] spawner.
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Callback invoked with every published snapshot.
pub type SessionObserver = Arc<dyn Fn(&Session) + Send + Sync>;

struct StoreState {
	session: Session,
	latest_ticket: u64,
}

/// Holds the current [`Session`] and republishes it on every identity change.
pub struct SessionStore {
	identity: Arc<dyn IdentityProvider>,
	resolver: ProfileResolver,
	state: RwLock<StoreState>,
	observers: Mutex<BTreeMap<u64, SessionObserver>>,
	next_observer: AtomicU64,
	subscription: Mutex<Option<Subscription>>,
	bootstrap_guard: AsyncMutex<()>,
	bootstrapped: AtomicBool,
	closed: AtomicBool,
	metrics: SessionMetrics,
}
impl SessionStore {
	/// Creates a store that is not subscribed to change notifications.
	///
	/// Callers feed it through [`SessionStore::handle_change`]; use [`SessionStore::attach`] for
	/// the subscribed variant.
	pub fn new(identity: Arc<dyn IdentityProvider>, directory: Arc<dyn ProfileDirectory>) -> Self {
		Self {
			identity,
			resolver: ProfileResolver::new(directory),
			state: RwLock::new(StoreState { session: Session::initializing(), latest_ticket: 0 }),
			observers: Default::default(),
			next_observer: AtomicU64::new(0),
			subscription: Mutex::new(None),
			bootstrap_guard: AsyncMutex::new(()),
			bootstrapped: AtomicBool::new(false),
			closed: AtomicBool::new(false),
			metrics: SessionMetrics::default(),
		}
	}

	/// Creates a store and subscribes it to the identity provider.
	///
	/// Each notification is ticketed on arrival, wrapped in a [`Task`], and handed to `spawn`,
	/// which must drive it to completion on the caller's executor (for example
	/// `|task| { tokio::spawn(task); }`). Tasks may run in any order; only the one holding the
	/// newest ticket publishes.
	pub fn attach(
		identity: Arc<dyn IdentityProvider>,
		directory: Arc<dyn ProfileDirectory>,
		spawn: impl 'static + Fn(Task) + Send + Sync,
	) -> Arc<Self> {
		let store = Arc::new(Self::new(identity, directory));
		let weak = Arc::downgrade(&store);
		let listener: SessionListener = Arc::new(move |change: SessionChange| {
			let Some(store) = weak.upgrade() else {
				return;
			};

			let ticket = store.issue_ticket();

			spawn(Box::pin(async move { store.apply_change(ticket, change).await }));
		});
		let subscription = store.identity.subscribe(listener);

		*store.subscription.lock() = Some(subscription);

		store
	}

	/// Fetches the persisted session and its profile, then leaves the loading state.
	///
	/// Only the first completed call performs the fetch; later calls return the current
	/// snapshot. Concurrent calls wait for the one in flight. A call dropped before it publishes
	/// leaves the store unbootstrapped, so the next call fetches again. A failing session fetch
	/// is treated as "signed out".
	pub async fn bootstrap(&self) -> Session {
		const KIND: OpKind = OpKind::Bootstrap;

		if self.bootstrapped.load(Ordering::Acquire) {
			return self.snapshot();
		}

		let _singleflight = self.bootstrap_guard.lock().await;

		if self.bootstrapped.load(Ordering::Acquire) {
			return self.snapshot();
		}

		let span = OpSpan::new(KIND, "bootstrap");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let ticket = self.issue_ticket();

		span.instrument(async {
			let identity = match self.identity.current_session().await {
				Ok(session) => session.map(|session| session.identity),
				Err(err) => {
					obs::report_degraded(KIND, &err);

					None
				},
			};
			let session = self.derive(identity).await;

			if !self.publish(ticket, session) {
				self.metrics.record_stale();
			}
		})
		.await;

		self.bootstrapped.store(true, Ordering::Release);
		obs::record_op_outcome(KIND, OpOutcome::Success);

		self.snapshot()
	}

	/// Applies one identity-provider notification.
	///
	/// The ticket is taken when this is called, not when the returned future is first polled, so
	/// a later call always supersedes an earlier one. Faults never escape: a failing profile
	/// fetch publishes the identity without a profile.
	pub fn handle_change(&self, change: SessionChange) -> impl Future<Output = ()> + Send + '_ {
		let ticket = self.issue_ticket();

		self.apply_change(ticket, change)
	}

	async fn apply_change(&self, ticket: u64, change: SessionChange) {
		const KIND: OpKind = OpKind::SessionChange;

		if self.is_closed() {
			return;
		}

		let span = OpSpan::new(KIND, change.event.as_str());

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let identity = change.session.map(|session| session.identity);
		let published = span
			.instrument(async {
				let session = self.derive(identity).await;

				self.publish(ticket, session)
			})
			.await;

		if !published {
			self.metrics.record_stale();
			obs::report_event(KIND, "superseded snapshot dropped");
		}

		obs::record_op_outcome(KIND, OpOutcome::Success);
	}

	/// Publishes the signed-out state without consulting the identity provider.
	///
	/// Used when a remote sign-out fails; supersedes any in-flight profile fetch.
	pub fn sign_out_locally(&self) -> bool {
		let ticket = self.issue_ticket();

		self.publish(ticket, Session::signed_out())
	}

	/// Returns the current snapshot.
	pub fn snapshot(&self) -> Session {
		self.state.read_recursive().session.clone()
	}

	/// Registers `observer` for future snapshots; dropping the handle detaches it.
	///
	/// Observers run synchronously while the store holds its read lock, so they may call
	/// [`SessionStore::snapshot`] but must not publish (sign out locally, handle changes) inline.
	pub fn observe(
		self: &Arc<Self>,
		observer: impl 'static + Fn(&Session) + Send + Sync,
	) -> ObserverHandle {
		let id = self.next_observer.fetch_add(1, Ordering::Relaxed);

		if !self.is_closed() {
			self.observers.lock().insert(id, Arc::new(observer));
		}

		ObserverHandle { id, store: Arc::downgrade(self) }
	}

	/// Number of attached observers.
	pub fn observer_count(&self) -> usize {
		self.observers.lock().len()
	}

	/// Returns `true` while the change subscription is registered.
	pub fn is_subscribed(&self) -> bool {
		self.subscription.lock().as_ref().is_some_and(Subscription::is_active)
	}

	/// Returns `true` once [`SessionStore::teardown`] has run.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}

	/// Identity provider the store is bound to.
	pub fn identity_provider(&self) -> &Arc<dyn IdentityProvider> {
		&self.identity
	}

	/// Counters describing publications, stale drops, and lookup faults.
	pub fn metrics(&self) -> &SessionMetrics {
		&self.metrics
	}

	/// Releases the change subscription and detaches every observer.
	///
	/// Synchronous and idempotent; also runs on drop. Later notifications are ignored.
	pub fn teardown(&self) {
		if self.closed.swap(true, Ordering::AcqRel) {
			return;
		}

		let subscription = self.subscription.lock().take();

		if let Some(subscription) = subscription {
			subscription.unsubscribe();
		}

		self.observers.lock().clear();
	}

	fn issue_ticket(&self) -> u64 {
		let mut state = self.state.write();

		state.latest_ticket += 1;

		state.latest_ticket
	}

	async fn derive(&self, identity: Option<Identity>) -> Session {
		let Some(identity) = identity else {
			return Session::signed_out();
		};
		let lookup = self.resolver.lookup(&identity.id).await;

		if lookup.is_fault() {
			self.metrics.record_lookup_fault();
		}

		Session::signed_in(identity, lookup.into_profile())
	}

	fn publish(&self, ticket: u64, session: Session) -> bool {
		let mut state = self.state.write();

		if ticket != state.latest_ticket || self.is_closed() {
			return false;
		}

		state.session = session;

		let state = RwLockWriteGuard::downgrade(state);
		let observers = self.observers.lock().values().cloned().collect::<Vec<_>>();

		self.metrics.record_published();

		for observer in observers {
			observer(&state.session);
		}

		true
	}
}
impl Drop for SessionStore {
	fn drop(&mut self) {
		self.teardown();
	}
}
impl Debug for SessionStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionStore")
			.field("session", &self.snapshot())
			.field("observers", &self.observer_count())
			.field("subscribed", &self.is_subscribed())
			.field("closed", &self.is_closed())
			.finish()
	}
}

/// Keeps an observer attached to a [`SessionStore`]; detaches on drop.
#[derive(Debug)]
pub struct ObserverHandle {
	id: u64,
	store: Weak<SessionStore>,
}
impl ObserverHandle {
	/// Detaches the observer now.
	pub fn detach(self) {}
}
impl Drop for ObserverHandle {
	fn drop(&mut self) {
		if let Some(store) = self.store.upgrade() {
			store.observers.lock().remove(&self.id);
		}
	}
}
