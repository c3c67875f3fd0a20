//! Closed privilege levels attached to profiles.

// self
use crate::_prelude::*;

/// Privilege level stored on a profile row.
///
/// Only two roles exist. A row carrying any other value fails to decode and is treated the same
/// way as a missing profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// May manage inventory.
	Admin,
	/// May manage inventory and other admin accounts.
	SuperAdmin,
}
impl Role {
	/// Every role, lowest privilege first.
	pub const ALL: [Role; 2] = [Role::Admin, Role::SuperAdmin];

	/// Returns the stored column value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Role::Admin => "admin",
			Role::SuperAdmin => "super_admin",
		}
	}

	/// Returns the human-facing label shown next to account details.
	pub const fn label(self) -> &'static str {
		match self {
			Role::Admin => "Admin",
			Role::SuperAdmin => "Super Admin",
		}
	}

	/// Returns `true` for [`Role::SuperAdmin`].
	pub const fn is_super_admin(self) -> bool {
		matches!(self, Role::SuperAdmin)
	}
}
impl Display for Role {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Role {
	type Err = UnknownRole;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"admin" => Ok(Role::Admin),
			"super_admin" => Ok(Role::SuperAdmin),
			other => Err(UnknownRole(other.to_owned())),
		}
	}
}

/// Error returned when a string does not name a [`Role`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown role `{0}`.")]
pub struct UnknownRole(pub String);
