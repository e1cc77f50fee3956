//! Shared-secret check guarding the admin parameter path.
//!
//! Plain string equality against a constant baked into the firmware image:
//! no hashing, no lockout, no attempt counter.

/// The firmware's hard-coded admin password.
pub const ADMIN_CREDENTIAL: &str = "SPQR2025";

#[inline]
pub fn validate_admin_credential(candidate: &str) -> bool {
    candidate == ADMIN_CREDENTIAL
}
