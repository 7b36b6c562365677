//! Group and user resolution.
//!
//! The libc lookup functions behind `getgrnam`/`getpwnam` share process
//! wide state, so every lookup goes through one lock. Callers depend on
//! [`IdentityResolver`] so other hosts and tests can supply their own
//! tables.

use std::sync::{Mutex, PoisonError};

use appcell_common::error::{AppcellError, Result};

/// Resolves names to numeric identities.
pub trait IdentityResolver: Send + Sync {
    /// Resolves a group name to its GID.
    ///
    /// # Errors
    ///
    /// Returns an error if the group does not exist.
    fn group_id(&self, name: &str) -> Result<u32>;

    /// Resolves a user name to its `(uid, gid)` pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist.
    fn user_identity(&self, name: &str) -> Result<(u32, u32)>;
}

static LOOKUP_LOCK: Mutex<()> = Mutex::new(());

/// [`IdentityResolver`] backed by the system group and password databases.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentity;

impl IdentityResolver for SystemIdentity {
    fn group_id(&self, name: &str) -> Result<u32> {
        let _guard = LOOKUP_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        match nix::unistd::Group::from_name(name) {
            Ok(Some(group)) => Ok(group.gid.as_raw()),
            Ok(None) => Err(AppcellError::NotFound {
                kind: "group",
                id: name.to_string(),
            }),
            Err(e) => Err(AppcellError::Sys {
                operation: "getgrnam",
                path: name.into(),
                source: e.into(),
            }),
        }
    }

    fn user_identity(&self, name: &str) -> Result<(u32, u32)> {
        let _guard = LOOKUP_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        match nix::unistd::User::from_name(name) {
            Ok(Some(user)) => Ok((user.uid.as_raw(), user.gid.as_raw())),
            Ok(None) => Err(AppcellError::NotFound {
                kind: "user",
                id: name.to_string(),
            }),
            Err(e) => Err(AppcellError::Sys {
                operation: "getpwnam",
                path: name.into(),
                source: e.into(),
            }),
        }
    }
}

/// Resolves the fixed service account to its `(uid, gid)`.
///
/// # Errors
///
/// Returns an error if the account is not present on the system.
pub fn resolve_service_identity(
    resolver: &dyn IdentityResolver,
    service_user: &str,
) -> Result<(u32, u32)> {
    resolver.user_identity(service_user).inspect_err(|e| {
        tracing::error!(user = service_user, error = %e, "service account not found");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_group_resolves_to_zero() {
        assert_eq!(SystemIdentity.group_id("root").expect("root group"), 0);
    }

    #[test]
    fn root_user_resolves_to_zero() {
        assert_eq!(SystemIdentity.user_identity("root").expect("root user"), (0, 0));
    }

    #[test]
    fn unknown_group_is_not_found() {
        let err = SystemIdentity
            .group_id("appcell-no-such-group")
            .expect_err("unknown group");
        assert!(matches!(err, AppcellError::NotFound { kind: "group", .. }));
    }

    #[test]
    fn missing_service_account_is_an_error() {
        assert!(resolve_service_identity(&SystemIdentity, "appcell-no-such-user").is_err());
    }

    #[test]
    fn concurrent_lookups_agree() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| SystemIdentity.group_id("root").ok()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("join"), Some(0));
        }
    }
}
