//! In-process collaborator implementations for tests, demos, and local development.

pub mod memory;

pub use memory::*;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::auth::Secret;

const SALT_LEN: usize = 16;
const ROW_ID_LEN: usize = 20;
const ACCESS_TOKEN_LEN: usize = 40;

/// Salted SHA-256 digest of a password.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct PasswordDigest {
	salt: String,
	digest: String,
}
impl PasswordDigest {
	pub(crate) fn new(password: &Secret) -> Self {
		let salt = random_string(SALT_LEN);
		let digest = digest(&salt, password);

		Self { salt, digest }
	}

	pub(crate) fn verify(&self, password: &Secret) -> bool {
		digest(&self.salt, password) == self.digest
	}
}

/// Backend-style row id, e.g. `usr_3fZk...`.
pub(crate) fn row_id(prefix: &str) -> String {
	format!("{prefix}_{}", random_string(ROW_ID_LEN))
}

pub(crate) fn access_token() -> Secret {
	Secret::new(random_string(ACCESS_TOKEN_LEN))
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn digest(salt: &str, password: &Secret) -> String {
	let mut hasher = Sha256::new();

	hasher.update(salt.as_bytes());
	hasher.update(password.expose().as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn digests_verify_only_the_original_password() {
		let stored = PasswordDigest::new(&Secret::new("hoppy-secret"));

		assert!(stored.verify(&Secret::new("hoppy-secret")));
		assert!(!stored.verify(&Secret::new("hoppy-secreT")));
	}

	#[test]
	fn salts_differ_between_digests() {
		let password = Secret::new("hoppy-secret");

		assert!(PasswordDigest::new(&password) != PasswordDigest::new(&password));
	}

	#[test]
	fn row_ids_are_valid_identifiers() {
		let id = row_id("usr");

		assert!(id.starts_with("usr_"));
		assert!(crate::auth::UserId::new(id).is_ok());
	}
}
