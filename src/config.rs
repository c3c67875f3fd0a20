//! Route table and application settings.
//!
//! [`Settings`] deserializes from JSON with every field optional; missing fields fall back to the
//! defaults below and the assembled value is validated before use.

// std
use std::{fs, path::Path};
// self
use crate::{_prelude::*, error::ConfigError};

/// Named destinations the gates and views navigate to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
	/// Public landing page.
	Home,
	/// Public beer catalog.
	Beers,
	/// Admin sign-in form.
	Login,
	/// Admin landing page.
	Dashboard,
	/// Admin inventory editor.
	Inventory,
	/// Super-admin user management.
	Users,
}
impl Route {
	/// Every route in declaration order.
	pub const ALL: [Route; 6] =
		[Route::Home, Route::Beers, Route::Login, Route::Dashboard, Route::Inventory, Route::Users];

	/// Stable label used in config keys and error messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			Route::Home => "home",
			Route::Beers => "beers",
			Route::Login => "login",
			Route::Dashboard => "dashboard",
			Route::Inventory => "inventory",
			Route::Users => "users",
		}
	}

	const fn default_path(self) -> &'static str {
		match self {
			Route::Home => "/",
			Route::Beers => "/beers",
			Route::Login => "/admin/login",
			Route::Dashboard => "/admin/dashboard",
			Route::Inventory => "/admin/inventory",
			Route::Users => "/admin/users",
		}
	}
}
impl Display for Route {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Maps each [`Route`] to a URL path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Route, String>", into = "BTreeMap<Route, String>")]
pub struct Routes(BTreeMap<Route, String>);
impl Routes {
	/// Returns the path configured for `route`.
	pub fn path(&self, route: Route) -> &str {
		self.0.get(&route).map(String::as_str).unwrap_or(route.default_path())
	}

	/// Reverse lookup used to highlight the active navigation entry.
	pub fn route_for(&self, path: &str) -> Option<Route> {
		Route::ALL.into_iter().find(|route| self.path(*route) == path)
	}

	/// Returns a copy with `route` mapped to `path`, validating the result.
	pub fn with_path(&self, route: Route, path: impl Into<String>) -> Result<Self, ConfigError> {
		let mut paths = self.0.clone();

		paths.insert(route, path.into());

		Self::try_from(paths)
	}
}
impl Default for Routes {
	fn default() -> Self {
		Self(Route::ALL.into_iter().map(|route| (route, route.default_path().to_owned())).collect())
	}
}
impl TryFrom<BTreeMap<Route, String>> for Routes {
	type Error = ConfigError;

	fn try_from(overrides: BTreeMap<Route, String>) -> Result<Self, Self::Error> {
		let mut paths = Routes::default().0;

		paths.extend(overrides);

		for (route, path) in &paths {
			if !path.starts_with('/') || path.chars().any(char::is_whitespace) {
				return Err(ConfigError::InvalidRoutePath { route: route.as_str(), path: path.clone() });
			}
		}

		let mut seen = BTreeMap::<&str, Route>::new();

		for (route, path) in &paths {
			if let Some(first) = seen.insert(path.as_str(), *route) {
				return Err(ConfigError::DuplicateRoutePath {
					first: first.as_str(),
					second: route.as_str(),
					path: path.clone(),
				});
			}
		}

		Ok(Self(paths))
	}
}
impl From<Routes> for BTreeMap<Route, String> {
	fn from(value: Routes) -> Self {
		value.0
	}
}

/// Tunables for the catalog and account screens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
	/// Navigation targets.
	pub routes: Routes,
	/// Number of beers on the landing page.
	pub featured_count: usize,
	/// Minimum password length accepted when creating accounts.
	pub min_password_len: usize,
	/// Upper bound for a beer's ABV, in percent.
	pub max_abv: f64,
	/// Stock level at or below which an in-stock size counts as running low.
	pub low_stock_threshold: u32,
	/// Number of beers listed on the admin dashboard.
	pub recent_count: usize,
}
impl Settings {
	/// Parses settings from a JSON document and validates them.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let settings: Self = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::Parse { source })?;

		settings.validate()
	}

	/// Reads and parses a JSON settings file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = fs::read_to_string(path)?;

		Self::from_json(&raw)
	}

	fn validate(self) -> Result<Self, ConfigError> {
		if self.featured_count == 0 {
			return Err(ConfigError::OutOfRange { name: "featured_count" });
		}
		if self.min_password_len == 0 {
			return Err(ConfigError::OutOfRange { name: "min_password_len" });
		}
		if !self.max_abv.is_finite() || self.max_abv <= 0.0 {
			return Err(ConfigError::OutOfRange { name: "max_abv" });
		}
		if self.recent_count == 0 {
			return Err(ConfigError::OutOfRange { name: "recent_count" });
		}

		Ok(self)
	}
}
impl Default for Settings {
	fn default() -> Self {
		Self {
			routes: Routes::default(),
			featured_count: 4,
			min_password_len: 6,
			max_abv: 20.0,
			low_stock_threshold: 5,
			recent_count: 5,
		}
	}
}
