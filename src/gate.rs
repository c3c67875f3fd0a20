//! Authorization gates guarding protected views.
//!
//! [`evaluate`] is the pure decision function. [`Gate`] wraps it for a mounted view: it remembers
//! the last `{identity, profile, loading, policy}` it saw and reports a navigation only when that
//! key changes, so re-rendering an unchanged session never redirects twice.

// self
use crate::{
	_prelude::*,
	auth::{Profile, Role, UserId},
	config::Route,
	session::Session,
	view::Navigator,
};

/// Privilege a protected view asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
	/// Either admin role.
	Admin,
	/// Only [`Role::SuperAdmin`].
	SuperAdmin,
}
impl Requirement {
	/// Maps a `require_super_admin` flag onto a requirement.
	pub const fn from_super_admin(require_super_admin: bool) -> Self {
		if require_super_admin { Requirement::SuperAdmin } else { Requirement::Admin }
	}

	/// Returns `true` when `role` satisfies the requirement.
	pub const fn allows(self, role: Role) -> bool {
		match (self, role) {
			(Requirement::Admin, Role::Admin | Role::SuperAdmin) => true,
			(Requirement::SuperAdmin, Role::SuperAdmin) => true,
			(Requirement::SuperAdmin, Role::Admin) => false,
		}
	}

	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Requirement::Admin => "admin",
			Requirement::SuperAdmin => "super_admin",
		}
	}
}
impl Display for Requirement {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// What a gated view should do with the current session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Decision {
	/// Render the protected content.
	Render,
	/// Render a placeholder and navigate to the route.
	Redirect(Route),
	/// Render a placeholder; authorization is not known yet.
	Pending,
}
impl Decision {
	/// Returns `true` only for [`Decision::Render`].
	pub const fn shows_content(self) -> bool {
		matches!(self, Decision::Render)
	}

	/// Target route of a redirect.
	pub const fn redirect_target(self) -> Option<Route> {
		match self {
			Decision::Redirect(route) => Some(route),
			_ => None,
		}
	}
}

/// Decides whether `session` may see a view requiring `requirement`. Fails closed.
pub fn evaluate(session: &Session, requirement: Requirement) -> Decision {
	if session.loading {
		return Decision::Pending;
	}

	let Some(identity) = &session.identity else {
		return Decision::Redirect(Route::Login);
	};
	let Some(profile) = &session.profile else {
		return Decision::Redirect(Route::Login);
	};

	if !profile.belongs_to(&identity.id) || !requirement.allows(profile.role) {
		return Decision::Redirect(Route::Login);
	}

	Decision::Render
}

/// Fails with [`Error::Forbidden`] unless `session` satisfies `requirement` right now.
///
/// Used by mutating operations; a session that is still loading is refused.
pub fn authorize(session: &Session, requirement: Requirement) -> Result<()> {
	if evaluate(session, requirement).shows_content() {
		Ok(())
	} else {
		Err(Error::Forbidden { required: requirement })
	}
}

/// Decides what the sign-in page shows: signed-in users go to the dashboard.
pub fn evaluate_login_page(session: &Session) -> Decision {
	if session.loading {
		Decision::Pending
	} else if session.identity.is_some() {
		Decision::Redirect(Route::Dashboard)
	} else {
		Decision::Render
	}
}

/// Rule a [`Gate`] applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GatePolicy {
	/// Protected admin view.
	Protected(Requirement),
	/// Public sign-in page.
	LoginPage,
}
impl GatePolicy {
	/// Applies the policy to `session`.
	pub fn decide(self, session: &Session) -> Decision {
		match self {
			GatePolicy::Protected(requirement) => evaluate(session, requirement),
			GatePolicy::LoginPage => evaluate_login_page(session),
		}
	}
}

/// Result of [`Gate::check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateOutcome {
	/// Decision for the current render.
	pub decision: Decision,
	/// Navigation to fire now; `None` when the inputs did not change since the last check.
	pub navigate: Option<Route>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct GateKey {
	policy: GatePolicy,
	identity: Option<UserId>,
	profile: Option<Profile>,
	loading: bool,
}
impl GateKey {
	fn new(policy: GatePolicy, session: &Session) -> Self {
		Self {
			policy,
			identity: session.user_id().cloned(),
			profile: session.profile.clone(),
			loading: session.loading,
		}
	}
}

#[derive(Debug)]
struct GateState {
	policy: GatePolicy,
	last: Option<GateKey>,
}

/// Stateful guard for one mounted view.
#[derive(Debug)]
pub struct Gate(Mutex<GateState>);
impl Gate {
	/// Creates a gate with the provided policy.
	pub fn new(policy: GatePolicy) -> Self {
		Self(Mutex::new(GateState { policy, last: None }))
	}

	/// Gate for an admin view.
	pub fn protected(requirement: Requirement) -> Self {
		Self::new(GatePolicy::Protected(requirement))
	}

	/// Gate for the sign-in page.
	pub fn login_page() -> Self {
		Self::new(GatePolicy::LoginPage)
	}

	/// Current policy.
	pub fn policy(&self) -> GatePolicy {
		self.0.lock().policy
	}

	/// Replaces the policy; the next check re-evaluates and may navigate.
	pub fn set_policy(&self, policy: GatePolicy) {
		self.0.lock().policy = policy;
	}

	/// Evaluates the session and reports whether a navigation should fire.
	pub fn check(&self, session: &Session) -> GateOutcome {
		let mut state = self.0.lock();
		let decision = state.policy.decide(session);
		let key = GateKey::new(state.policy, session);

		if state.last.as_ref() == Some(&key) {
			return GateOutcome { decision, navigate: None };
		}

		state.last = Some(key);

		GateOutcome { decision, navigate: decision.redirect_target() }
	}

	/// Runs [`Gate::check`] and forwards any navigation to `navigator`.
	pub fn drive(&self, session: &Session, navigator: &dyn Navigator) -> Decision {
		let GateOutcome { decision, navigate } = self.check(session);

		if let Some(route) = navigate {
			navigator.navigate(route);
		}

		decision
	}
}
