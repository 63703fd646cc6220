//! Inputs to [`Desk::apply`](super::Desk::apply).

use crate::types::{
    Category, Comment, Identity, Notification, NotificationId, Profile, Ticket, TicketDraft,
    TicketId, TicketStatus,
};
use crate::views::{DateRange, SortOrder};

use super::ui::{ActiveOverlay, Modal, Tab};

/// Results of the three fetches issued on session entry.
///
/// `None` in a slot means that fetch failed and the slot stays empty.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub identity: Identity,
    pub profile: Option<Profile>,
    pub tickets: Option<Vec<Ticket>>,
    pub notifications: Option<Vec<Notification>>,
}

/// Everything that can change a desk.
///
/// UI intents and confirmed gateway results both arrive here; gateway calls
/// themselves happen before the event is applied.
#[derive(Debug, Clone)]
pub enum DeskEvent {
    /// The existing-session check found nothing.
    NoSession,
    /// Signed in or resumed, with whatever the entry fetches returned.
    SessionEntered(Box<SessionData>),
    /// Credentials were rejected.
    SignInFailed(String),
    SignedOut,
    /// The gateway moved the session to another account.
    SessionSwitched { notice: String },
    /// An account was created but the session stayed as it was.
    AccountCreated { notice: String },
    /// Drop everything and resolve the session again.
    Reload,

    Navigate(Tab),
    ToggleOverlay(ActiveOverlay),
    CloseOverlay,
    OpenModal(Modal),
    CloseModal,
    DismissAlert,

    SearchChanged(String),
    CategoryFilterChanged(Option<Category>),
    StatusFilterChanged(Option<TicketStatus>),
    SortChanged(SortOrder),
    FiltersReset,
    DateRangeChanged(DateRange),

    /// Create-ticket form contents, kept so a failed submit can be retried.
    DraftEdited(TicketDraft),
    TicketCreated(Ticket),
    NotificationsRefreshed(Vec<Notification>),
    TicketOpened(Ticket),
    StatusChanged { id: TicketId, status: TicketStatus },
    ResolvedArchived,
    DeleteRequested(TicketId),
    TicketDeleted(TicketId),
    CommentAdded(Comment),
    NotificationRead(NotificationId),
    NotificationsCleared,
    ProfileUpdated(Profile),
    /// A write was rejected; shown as a blocking alert.
    MutationFailed(String),
}

impl DeskEvent {
    /// Whether the event originates inside the open menu.
    ///
    /// Every other event counts as a click outside it and closes the menu.
    #[must_use]
    pub const fn keeps_overlay(&self) -> bool {
        matches!(self, Self::ToggleOverlay(_) | Self::NotificationsCleared)
    }
}
