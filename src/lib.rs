//! Brewery inventory admin core: an explicit session store fed by pushed identity changes,
//! fail-closed authorization gates, role-aware view models, and the catalog and user
//! administration operations those gates protect.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod admin;
pub mod auth;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gate;
pub mod obs;
pub mod provider;
pub mod session;
pub mod view;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and seeded fixtures for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::{_prelude::*, view::RecordingNavigator};

	// self
	use crate::{
		auth::{Identity, Role, Secret},
		backend::MemoryBackend,
	};

	/// Email of the seeded admin account.
	pub const ADMIN_EMAIL: &str = "admin@example.com";
	/// Email of the seeded super admin account.
	pub const SUPER_ADMIN_EMAIL: &str = "owner@example.com";
	/// Email of a seeded account that has no profile row.
	pub const NO_PROFILE_EMAIL: &str = "drifter@example.com";
	/// Password shared by every seeded account.
	pub const PASSWORD: &str = "hoppy-secret";

	/// Identities created by [`seeded_backend`].
	#[derive(Clone, Debug)]
	pub struct SeededAccounts {
		/// Account holding the `admin` role.
		pub admin: Identity,
		/// Account holding the `super_admin` role.
		pub super_admin: Identity,
		/// Authenticated account without a profile row.
		pub no_profile: Identity,
	}

	/// Builds an in-memory backend with an admin, a super admin, and a profile-less account.
	pub fn seeded_backend() -> (Arc<MemoryBackend>, SeededAccounts) {
		let backend = Arc::new(MemoryBackend::default());
		let password = Secret::new(PASSWORD);
		let admin = backend
			.register_user(ADMIN_EMAIL, &password, Some(Role::Admin))
			.expect("Seeding the admin account should succeed.");
		let super_admin = backend
			.register_user(SUPER_ADMIN_EMAIL, &password, Some(Role::SuperAdmin))
			.expect("Seeding the super admin account should succeed.");
		let no_profile = backend
			.register_user(NO_PROFILE_EMAIL, &password, None)
			.expect("Seeding the profile-less account should succeed.");

		(backend, SeededAccounts { admin, super_admin, no_profile })
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::{Arc, Weak},
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

#[cfg(test)] use color_eyre as _;
