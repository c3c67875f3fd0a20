//! Identity, role, and profile models shared by the session store and the gates.

pub mod id;
pub mod identity;
pub mod profile;
pub mod role;
pub mod secret;

pub use id::*;
pub use identity::*;
pub use profile::*;
pub use role::*;
pub use secret::*;
