//! Role-aware view models and the sign-in/sign-out controls.

// self
use crate::{
	_prelude::*,
	auth::{Identity, Secret},
	config::{Route, Routes},
	obs::{self, OpKind, OpOutcome, OpSpan},
	provider::IdentityProvider,
	session::{Session, SessionStore},
};

/// Page-level navigation primitive supplied by the host application.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Navigates to `route`.
	fn navigate(&self, route: Route);
}

/// [`Navigator`] that records every requested route instead of changing pages.
///
/// Visits are resolved through a [`Routes`] table, so hosts with customised paths can check
/// where a page would have gone.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
	routes: Routes,
	visits: Mutex<Vec<Route>>,
}
impl RecordingNavigator {
	/// Creates a navigator resolving paths through `routes`.
	pub fn new(routes: Routes) -> Self {
		Self { routes, visits: Default::default() }
	}

	/// Returns all routes navigated to so far, oldest first.
	pub fn visits(&self) -> Vec<Route> {
		self.visits.lock().clone()
	}

	/// Returns the most recent route, if any.
	pub fn last(&self) -> Option<Route> {
		self.visits.lock().last().copied()
	}

	/// Returns the URL path of every visit, oldest first.
	pub fn paths(&self) -> Vec<String> {
		self.visits.lock().iter().map(|route| self.routes.path(*route).to_owned()).collect()
	}
}
impl Navigator for RecordingNavigator {
	fn navigate(&self, route: Route) {
		self.visits.lock().push(route);
	}
}

/// One navigation entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavItem {
	/// Destination.
	pub route: Route,
	/// Visible label.
	pub label: &'static str,
	/// Leading glyph; empty for plain links.
	pub icon: &'static str,
	/// `true` when `route` is the page being shown.
	pub active: bool,
}
impl NavItem {
	fn new(route: Route, label: &'static str, icon: &'static str, current: Route) -> Self {
		Self { route, label, icon, active: route == current }
	}
}

/// Sidebar entries for the admin panel. User management appears only for super admins.
pub fn admin_nav(session: &Session, current: Route) -> Vec<NavItem> {
	let mut items = vec![
		NavItem::new(Route::Dashboard, "Dashboard", "📊", current),
		NavItem::new(Route::Inventory, "Inventory", "🍺", current),
	];

	if session.is_super_admin() {
		items.push(NavItem::new(Route::Users, "User Management", "👥", current));
	}

	items
}

/// "Signed in as" block at the foot of the admin sidebar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountBadge {
	/// Email of the signed-in account.
	pub email: Option<String>,
	/// Role label, e.g. "Super Admin".
	pub role_label: Option<&'static str>,
}
impl AccountBadge {
	/// Builds the badge for `session`.
	pub fn for_session(session: &Session) -> Self {
		Self {
			email: session.email().map(str::to_owned),
			role_label: session.role().map(|role| role.label()),
		}
	}
}

/// Account area on the right of the public header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountArea {
	/// Bootstrap has not resolved; show a skeleton.
	Loading,
	/// Nobody is signed in; show the sign-in control.
	SignIn,
	/// Show the email and a sign-out control.
	SignedIn {
		/// Email to display.
		email: String,
	},
}

/// Public header model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderView {
	/// Navigation links; the admin link appears only for sessions holding a role.
	pub links: Vec<NavItem>,
	/// Account area.
	pub account: AccountArea,
}
impl HeaderView {
	/// Builds the header for `session` while `current` is shown.
	pub fn for_session(session: &Session, current: Route) -> Self {
		let mut links = vec![
			NavItem::new(Route::Home, "Home", "", current),
			NavItem::new(Route::Beers, "Our Beers", "", current),
		];

		if session.is_admin() {
			links.push(NavItem::new(Route::Dashboard, "Admin", "", current));
		}

		let account = match (session.loading, session.email()) {
			(true, _) => AccountArea::Loading,
			(false, Some(email)) if session.identity.is_some() =>
				AccountArea::SignedIn { email: email.to_owned() },
			_ => AccountArea::SignIn,
		};

		Self { links, account }
	}
}

/// Values submitted by the sign-in form.
#[derive(Clone, Debug)]
pub struct SignInForm {
	/// Email address.
	pub email: String,
	/// Password.
	pub password: Secret,
}
impl SignInForm {
	/// Creates a form submission.
	pub fn new(email: impl Into<String>, password: impl Into<Secret>) -> Self {
		Self { email: email.into(), password: password.into() }
	}
}

/// Signs in and navigates to the dashboard.
///
/// Blank fields are rejected locally. A provider rejection is returned as
/// [`Error::Auth`], whose message is meant to be shown on the form verbatim.
pub async fn sign_in(
	identity: &dyn IdentityProvider,
	navigator: &dyn Navigator,
	form: &SignInForm,
) -> Result<Identity> {
	const KIND: OpKind = OpKind::SignIn;

	let email = form.email.trim();

	if email.is_empty() {
		return Err(Error::validation("email", "an email address is required"));
	}
	if form.password.is_empty() {
		return Err(Error::validation("password", "a password is required"));
	}

	let span = OpSpan::new(KIND, "sign_in");

	obs::record_op_outcome(KIND, OpOutcome::Attempt);

	let session =
		obs::record_result(KIND, span.instrument(identity.sign_in(email, &form.password)).await)?;

	navigator.navigate(Route::Dashboard);

	Ok(session.identity)
}

/// Best-effort sign-out: always clears the local session and navigates home.
///
/// A provider failure is logged and otherwise ignored.
pub async fn sign_out(store: &SessionStore, navigator: &dyn Navigator) {
	const KIND: OpKind = OpKind::SignOut;

	let span = OpSpan::new(KIND, "sign_out");

	obs::record_op_outcome(KIND, OpOutcome::Attempt);

	let result = span.instrument(store.identity_provider().sign_out()).await;

	if let Err(err) = &result {
		obs::report_degraded(KIND, err);
	}

	let _ = obs::record_result(KIND, result);

	store.sign_out_locally();
	navigator.navigate(Route::Home);
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::{Profile, Role, UserId};

	fn session(role: Option<Role>) -> Session {
		let identity = Identity::new(
			UserId::new("usr_1").expect("Identity fixture should be valid."),
			"brewer@example.com",
		);
		let profile = role.map(|role| {
			Profile::new(
				identity.id.clone(),
				"brewer@example.com",
				role,
				macros::datetime!(2025-01-01 00:00 UTC),
			)
		});

		Session::signed_in(identity, profile)
	}

	fn labels(items: &[NavItem]) -> Vec<&'static str> {
		items.iter().map(|item| item.label).collect()
	}

	#[test]
	fn user_management_is_super_admin_only() {
		let admin = admin_nav(&session(Some(Role::Admin)), Route::Inventory);
		let owner = admin_nav(&session(Some(Role::SuperAdmin)), Route::Users);

		assert_eq!(labels(&admin), ["Dashboard", "Inventory"]);
		assert_eq!(labels(&owner), ["Dashboard", "Inventory", "User Management"]);
		assert!(admin[1].active);
		assert!(owner[2].active);
		assert!(!owner[0].active);
	}

	#[test]
	fn header_reflects_session_state() {
		let loading = HeaderView::for_session(&Session::initializing(), Route::Home);

		assert_eq!(loading.account, AccountArea::Loading);
		assert_eq!(labels(&loading.links), ["Home", "Our Beers"]);

		let anonymous = HeaderView::for_session(&Session::signed_out(), Route::Beers);

		assert_eq!(anonymous.account, AccountArea::SignIn);
		assert!(anonymous.links[1].active);

		let admin = HeaderView::for_session(&session(Some(Role::Admin)), Route::Home);

		assert_eq!(admin.account, AccountArea::SignedIn { email: "brewer@example.com".into() });
		assert_eq!(labels(&admin.links), ["Home", "Our Beers", "Admin"]);

		let no_profile = HeaderView::for_session(&session(None), Route::Home);

		assert_eq!(labels(&no_profile.links), ["Home", "Our Beers"]);
		assert!(matches!(no_profile.account, AccountArea::SignedIn { .. }));
	}

	#[test]
	fn recorded_visits_resolve_through_the_route_table() {
		let routes = Routes::default()
			.with_path(Route::Login, "/staff/login")
			.expect("Custom login path should be valid.");
		let navigator = RecordingNavigator::new(routes);

		navigator.navigate(Route::Login);
		navigator.navigate(Route::Dashboard);

		assert_eq!(navigator.visits(), [Route::Login, Route::Dashboard]);
		assert_eq!(navigator.paths(), ["/staff/login", "/admin/dashboard"]);
		assert!(RecordingNavigator::default().paths().is_empty());
	}

	#[test]
	fn badge_uses_role_labels() {
		let badge = AccountBadge::for_session(&session(Some(Role::SuperAdmin)));

		assert_eq!(badge.email.as_deref(), Some("brewer@example.com"));
		assert_eq!(badge.role_label, Some("Super Admin"));
		assert_eq!(AccountBadge::for_session(&Session::signed_out()).role_label, None);
	}
}
