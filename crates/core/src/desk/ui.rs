//! UI slots of the desk: active tab, overlay menu, modal.

use crate::define_enum;
use crate::types::TicketId;

define_enum! {
    /// The five mutually exclusive views.
    Tab("tab") {
        Home => "home",
        Dashboard => "dashboard",
        Tickets => "tickets",
        Detail => "detail",
        Settings => "settings",
    }
}

impl Default for Tab {
    fn default() -> Self {
        Self::Home
    }
}

define_enum! {
    /// The single dropdown menu slot. At most one menu is open at a time.
    ActiveOverlay("overlay") {
        None => "none",
        FilterCategory => "filter-category",
        FilterStatus => "filter-status",
        Sort => "sort",
        Status => "status",
        Notifications => "notifications",
        User => "user",
    }
}

impl Default for ActiveOverlay {
    fn default() -> Self {
        Self::None
    }
}

impl ActiveOverlay {
    /// Whether a menu is open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Modal dialogs layered above the active tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Modal {
    #[default]
    None,
    CreateTicket,
    CreateAccount,
    ConfirmDelete(TicketId),
}

impl Modal {
    /// Ticket awaiting delete confirmation, if any.
    #[must_use]
    pub const fn pending_delete(self) -> Option<TicketId> {
        match self {
            Self::ConfirmDelete(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_names_are_closed() {
        assert_eq!(
            "filter-status".parse::<ActiveOverlay>().unwrap(),
            ActiveOverlay::FilterStatus
        );
        assert!("dropdown-42".parse::<ActiveOverlay>().is_err());
        assert!(!ActiveOverlay::None.is_open());
        assert!(ActiveOverlay::User.is_open());
    }

    #[test]
    fn test_pending_delete() {
        assert_eq!(
            Modal::ConfirmDelete(TicketId::new(9)).pending_delete(),
            Some(TicketId::new(9))
        );
        assert_eq!(Modal::CreateTicket.pending_delete(), None);
    }
}
