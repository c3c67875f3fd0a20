//! Identity -> profile resolution with fail-closed normalization.

// self
use crate::{
	_prelude::*,
	auth::{Profile, UserId},
	obs::{self, OpKind, OpOutcome, OpSpan},
	provider::{DirectoryError, ProfileDirectory},
};

/// Outcome of a profile lookup before normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileLookup {
	/// A well-formed profile owned by the requested identity.
	Found(Profile),
	/// The directory has no row for the identity.
	Missing,
	/// The directory failed, returned a malformed row, or returned someone else's row.
	Unavailable(DirectoryError),
}
impl ProfileLookup {
	/// Returns `true` for [`ProfileLookup::Unavailable`].
	pub fn is_fault(&self) -> bool {
		matches!(self, Self::Unavailable(_))
	}

	/// Collapses the lookup into "profile or nothing", logging faults.
	pub fn into_profile(self) -> Option<Profile> {
		match self {
			Self::Found(profile) => Some(profile),
			Self::Missing => None,
			Self::Unavailable(err) => {
				obs::report_degraded(OpKind::ProfileLookup, &err);

				None
			},
		}
	}
}

/// Resolves the privilege record for an identity.
#[derive(Clone)]
pub struct ProfileResolver {
	directory: Arc<dyn ProfileDirectory>,
}
impl ProfileResolver {
	/// Creates a resolver over the provided directory.
	pub fn new(directory: Arc<dyn ProfileDirectory>) -> Self {
		Self { directory }
	}

	/// Looks up exactly one profile, keeping faults distinguishable from absence.
	pub async fn lookup(&self, id: &UserId) -> ProfileLookup {
		const KIND: OpKind = OpKind::ProfileLookup;

		let span = OpSpan::new(KIND, "lookup");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let lookup = span
			.instrument(async {
				match self.directory.fetch_profile(id).await {
					Ok(Some(profile)) if profile.belongs_to(id) => ProfileLookup::Found(profile),
					Ok(Some(profile)) => ProfileLookup::Unavailable(DirectoryError::Malformed {
						path: "id".into(),
						message: format!("expected {id}, found {}", profile.id),
					}),
					Ok(None) | Err(DirectoryError::NotFound { .. }) => ProfileLookup::Missing,
					Err(err) => ProfileLookup::Unavailable(err),
				}
			})
			.await;

		obs::record_op_outcome(
			KIND,
			if lookup.is_fault() { OpOutcome::Failure } else { OpOutcome::Success },
		);

		lookup
	}

	/// Resolves the profile for `id`; any fault or absence yields `None`.
	pub async fn resolve(&self, id: &UserId) -> Option<Profile> {
		self.lookup(id).await.into_profile()
	}
}
impl Debug for ProfileResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ProfileResolver(..)")
	}
}
