//! Role to capability mapping.
//!
//! Helpers can work tickets (create, change status, reply) but cannot create
//! accounts or delete tickets; both of those are Admin-only.

use crate::types::{Profile, Role};

/// What the signed-in profile may do in the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_manage_users: bool,
    pub can_manage_tickets: bool,
    pub can_delete_tickets: bool,
}

impl Capabilities {
    /// Capabilities of a role.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        let is_admin = matches!(role, Role::Admin);
        Self {
            can_manage_users: is_admin,
            can_manage_tickets: matches!(role, Role::Admin | Role::Helper),
            can_delete_tickets: is_admin,
        }
    }

    /// Capabilities of an optional profile. No profile means no capabilities.
    #[must_use]
    pub fn for_profile(profile: Option<&Profile>) -> Self {
        profile.map_or_else(Self::default, |p| Self::for_role(p.role))
    }

    /// True when the viewer can only look at tickets.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        !self.can_manage_tickets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    fn profile(role: Role) -> Profile {
        Profile {
            id: UserId::random(),
            username: "test".to_string(),
            role,
            email_notifications: true,
        }
    }

    #[test]
    fn test_admin_can_do_everything() {
        let caps = Capabilities::for_profile(Some(&profile(Role::Admin)));
        assert!(caps.can_manage_users);
        assert!(caps.can_manage_tickets);
        assert!(caps.can_delete_tickets);
        assert!(!caps.is_read_only());
    }

    #[test]
    fn test_helper_manages_tickets_only() {
        let caps = Capabilities::for_profile(Some(&profile(Role::Helper)));
        assert!(!caps.can_manage_users);
        assert!(caps.can_manage_tickets);
        assert!(!caps.can_delete_tickets);
    }

    #[test]
    fn test_missing_profile_has_nothing() {
        let caps = Capabilities::for_profile(None);
        assert_eq!(caps, Capabilities::default());
        assert!(caps.is_read_only());
    }
}
