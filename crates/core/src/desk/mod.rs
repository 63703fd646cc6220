//! The desk: one browser's application state and its transitions.
//!
//! A [`Desk`] is a plain value. Handlers perform gateway calls first and then
//! feed the confirmed result to [`Desk::apply`], so every change to session,
//! cache, filters or UI goes through one match.

pub mod event;
pub mod ui;

use chrono::{DateTime, Utc};

pub use event::{DeskEvent, SessionData};
pub use ui::{ActiveOverlay, Modal, Tab};

use crate::permissions::Capabilities;
use crate::types::notification::unread_count;
use crate::types::{
    Identity, Notification, Profile, Ticket, TicketDraft, TicketId, TicketStatus,
};
use crate::views::{DashboardSummary, DateRange, RegistryQuery};

/// Where the viewer is in the sign-in lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// The existing-session check has not resolved yet.
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(Identity),
}

/// Tickets and notifications, newest first as returned by the gateway.
#[derive(Debug, Clone, Default)]
pub struct EntityCache {
    pub tickets: Vec<Ticket>,
    pub notifications: Vec<Notification>,
}

impl EntityCache {
    fn ticket_mut(&mut self, id: TicketId) -> Option<&mut Ticket> {
        self.tickets.iter_mut().find(|t| t.id == id)
    }
}

/// Registry inputs and the dashboard range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub registry: RegistryQuery,
    pub date_range: DateRange,
}

/// Everything that is only about presentation.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub active_tab: Tab,
    pub overlay: ActiveOverlay,
    pub modal: Modal,
    /// Ticket shown on the detail tab.
    pub detail: Option<Ticket>,
    /// Blocking message from a failed write or an account switch.
    pub alert: Option<String>,
    /// Inline message on the login form.
    pub auth_error: Option<String>,
    pub draft: TicketDraft,
}

#[derive(Debug, Clone, Default)]
pub struct Desk {
    pub session: SessionPhase,
    pub profile: Option<Profile>,
    pub cache: EntityCache,
    pub filters: Filters,
    pub ui: UiState,
}

impl Desk {
    /// The signed-in identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match &self.session {
            SessionPhase::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.session, SessionPhase::Loading)
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_profile(self.profile.as_ref())
    }

    /// Whether the viewer may open `modal`.
    #[must_use]
    pub fn allows(&self, modal: Modal) -> bool {
        let caps = self.capabilities();
        match modal {
            Modal::None => true,
            Modal::CreateTicket => caps.can_manage_tickets,
            Modal::CreateAccount => caps.can_manage_users,
            Modal::ConfirmDelete(_) => caps.can_delete_tickets,
        }
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        unread_count(&self.cache.notifications)
    }

    /// Cached ticket by id.
    #[must_use]
    pub fn ticket(&self, id: TicketId) -> Option<&Ticket> {
        self.cache.tickets.iter().find(|t| t.id == id)
    }

    /// The ticket registry as currently filtered and sorted.
    #[must_use]
    pub fn registry(&self) -> Vec<&Ticket> {
        self.filters.registry.apply(&self.cache.tickets)
    }

    #[must_use]
    pub fn dashboard(&self, now: DateTime<Utc>) -> DashboardSummary {
        DashboardSummary::compute(&self.cache.tickets, self.filters.date_range, now)
    }

    /// Apply one transition.
    ///
    /// Every event except [`DeskEvent::ToggleOverlay`] and
    /// [`DeskEvent::NotificationsCleared`] closes the open menu first.
    /// Modal requests the viewer is not allowed to make are ignored.
    pub fn apply(&mut self, event: DeskEvent) {
        if !event.keeps_overlay() {
            self.ui.overlay = ActiveOverlay::None;
        }

        match event {
            // ================================================================
            // Session
            // ================================================================
            DeskEvent::NoSession => {
                self.session = SessionPhase::Unauthenticated;
                self.profile = None;
                self.cache = EntityCache::default();
            }
            DeskEvent::SessionEntered(data) => {
                let SessionData {
                    identity,
                    profile,
                    tickets,
                    notifications,
                } = *data;
                // Nothing the previous user left open carries over
                if self
                    .identity()
                    .is_some_and(|current| current.user_id != identity.user_id)
                {
                    self.filters = Filters::default();
                    self.ui = UiState::default();
                }
                self.session = SessionPhase::Authenticated(identity);
                self.profile = profile;
                self.cache = EntityCache {
                    tickets: tickets.unwrap_or_default(),
                    notifications: notifications.unwrap_or_default(),
                };
                self.ui.auth_error = None;
            }
            DeskEvent::SignInFailed(message) => {
                self.session = SessionPhase::Unauthenticated;
                self.ui.auth_error = Some(message);
            }
            DeskEvent::SignedOut => self.reset(SessionPhase::Unauthenticated),
            DeskEvent::SessionSwitched { notice } => {
                self.reset(SessionPhase::Loading);
                self.ui.alert = Some(notice);
            }
            DeskEvent::AccountCreated { notice } => {
                self.ui.modal = Modal::None;
                self.ui.alert = Some(notice);
            }
            DeskEvent::Reload => self.reset(SessionPhase::Loading),

            // ================================================================
            // Navigation and overlays
            // ================================================================
            DeskEvent::Navigate(tab) => {
                if tab != Tab::Detail || self.ui.detail.is_some() {
                    self.ui.active_tab = tab;
                }
            }
            DeskEvent::ToggleOverlay(overlay) => {
                self.ui.overlay = if self.ui.overlay == overlay {
                    ActiveOverlay::None
                } else {
                    overlay
                };
            }
            DeskEvent::CloseOverlay => {}
            DeskEvent::OpenModal(modal) => {
                if self.allows(modal) {
                    self.ui.modal = modal;
                }
            }
            DeskEvent::CloseModal => self.ui.modal = Modal::None,
            DeskEvent::DismissAlert => self.ui.alert = None,

            // ================================================================
            // Filters
            // ================================================================
            DeskEvent::SearchChanged(search) => self.filters.registry.search = search,
            DeskEvent::CategoryFilterChanged(category) => {
                self.filters.registry.category = category;
            }
            DeskEvent::StatusFilterChanged(status) => self.filters.registry.status = status,
            DeskEvent::SortChanged(sort) => self.filters.registry.sort = sort,
            DeskEvent::FiltersReset => {
                self.filters.registry.category = None;
                self.filters.registry.status = None;
            }
            DeskEvent::DateRangeChanged(range) => self.filters.date_range = range,

            // ================================================================
            // Tickets
            // ================================================================
            DeskEvent::DraftEdited(draft) => self.ui.draft = draft,
            DeskEvent::TicketCreated(ticket) => {
                self.cache.tickets.insert(0, ticket);
                self.ui.modal = Modal::None;
                self.ui.draft = TicketDraft::default();
                self.ui.active_tab = Tab::Tickets;
            }
            DeskEvent::TicketOpened(ticket) => {
                self.ui.detail = Some(ticket);
                self.ui.active_tab = Tab::Detail;
            }
            DeskEvent::StatusChanged { id, status } => {
                if let Some(ticket) = self.cache.ticket_mut(id) {
                    ticket.status = status;
                }
                if let Some(detail) = self.ui.detail.as_mut().filter(|t| t.id == id) {
                    detail.status = status;
                }
            }
            DeskEvent::ResolvedArchived => {
                let archive = |t: &mut Ticket| {
                    if t.status == TicketStatus::Resolved {
                        t.status = TicketStatus::Closed;
                    }
                };
                self.cache.tickets.iter_mut().for_each(archive);
                self.ui.detail.iter_mut().for_each(archive);
            }
            DeskEvent::DeleteRequested(id) => {
                let modal = Modal::ConfirmDelete(id);
                if self.allows(modal) {
                    self.ui.modal = modal;
                }
            }
            DeskEvent::TicketDeleted(id) => {
                self.cache.tickets.retain(|t| t.id != id);
                if self.ui.detail.as_ref().is_some_and(|t| t.id == id) {
                    self.ui.detail = None;
                    if self.ui.active_tab == Tab::Detail {
                        self.ui.active_tab = Tab::Tickets;
                    }
                }
                self.ui.modal = Modal::None;
            }
            DeskEvent::CommentAdded(comment) => {
                if let Some(detail) = self
                    .ui
                    .detail
                    .as_mut()
                    .filter(|t| t.id == comment.ticket_id)
                {
                    detail.comments.push(comment.clone());
                }
                if let Some(ticket) = self.cache.ticket_mut(comment.ticket_id) {
                    ticket.comments.push(comment);
                }
            }

            // ================================================================
            // Notifications and profile
            // ================================================================
            DeskEvent::NotificationsRefreshed(notifications) => {
                self.cache.notifications = notifications;
            }
            DeskEvent::NotificationRead(id) => {
                if let Some(n) = self.cache.notifications.iter_mut().find(|n| n.id == id) {
                    n.is_read = true;
                }
            }
            DeskEvent::NotificationsCleared => {
                for n in &mut self.cache.notifications {
                    n.is_read = true;
                }
            }
            DeskEvent::ProfileUpdated(profile) => self.profile = Some(profile),
            DeskEvent::MutationFailed(message) => self.ui.alert = Some(message),
        }
    }

    fn reset(&mut self, phase: SessionPhase) {
        *self = Self {
            session: phase,
            ..Self::default()
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{
        Category, Comment, CommentId, NotificationId, Role, TicketPriority, TicketType, UserId,
    };
    use chrono::{Duration, TimeZone};

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn ticket(id: i64, title: &str, status: TicketStatus) -> Ticket {
        Ticket {
            id: TicketId::new(id),
            title: title.to_string(),
            ticket_type: TicketType::Incident,
            category: Category::Apps,
            priority: TicketPriority::Medium,
            status,
            description: String::new(),
            created_by: None,
            created_at: at(id),
            comments: Vec::new(),
        }
    }

    fn notification(id: i64, user_id: UserId, is_read: bool) -> Notification {
        Notification {
            id: NotificationId::new(id),
            user_id,
            ticket_id: Some(TicketId::new(1)),
            text: Notification::new_ticket_text("VPN down"),
            is_read,
            created_at: at(id),
        }
    }

    fn signed_in(role: Role) -> Desk {
        let user_id = UserId::random();
        let mut desk = Desk::default();
        desk.apply(DeskEvent::SessionEntered(Box::new(SessionData {
            identity: Identity {
                user_id,
                email: "staff@proxima.services".to_string(),
            },
            profile: Some(Profile {
                id: user_id,
                username: "sam".to_string(),
                role,
                email_notifications: true,
            }),
            tickets: Some(vec![
                ticket(3, "Printer jam", TicketStatus::Resolved),
                ticket(2, "VPN slow", TicketStatus::Open),
                ticket(1, "VPN outage", TicketStatus::Resolved),
            ]),
            notifications: Some(vec![
                notification(2, user_id, false),
                notification(1, user_id, false),
            ]),
        })));
        desk
    }

    #[test]
    fn test_new_desk_is_loading() {
        let desk = Desk::default();
        assert!(desk.is_loading());
        assert_eq!(desk.ui.active_tab, Tab::Home);
        assert_eq!(desk.capabilities(), Capabilities::default());
    }

    #[test]
    fn test_session_entry_with_failed_fetches_leaves_slots_empty() {
        let mut desk = Desk::default();
        desk.ui.auth_error = Some("Invalid login credentials".to_string());
        desk.apply(DeskEvent::SessionEntered(Box::new(SessionData {
            identity: Identity {
                user_id: UserId::random(),
                email: "a@b.c".to_string(),
            },
            profile: None,
            tickets: None,
            notifications: None,
        })));

        assert!(desk.identity().is_some());
        assert!(desk.profile.is_none());
        assert!(desk.cache.tickets.is_empty());
        assert!(desk.ui.auth_error.is_none());
        assert!(desk.capabilities().is_read_only());
    }

    #[test]
    fn test_entering_as_another_user_drops_previous_view() {
        let mut desk = signed_in(Role::Admin);
        desk.apply(DeskEvent::TicketOpened(ticket(2, "VPN slow", TicketStatus::Open)));
        desk.apply(DeskEvent::SearchChanged("vpn".to_string()));
        desk.apply(DeskEvent::MutationFailed("Could not delete ticket".to_string()));
        desk.apply(DeskEvent::DraftEdited(TicketDraft {
            title: "Half written".to_string(),
            ..TicketDraft::default()
        }));

        let same_user = desk.identity().cloned().unwrap();
        let profile = desk.profile.clone();
        desk.apply(DeskEvent::SessionEntered(Box::new(SessionData {
            identity: same_user,
            profile,
            tickets: None,
            notifications: None,
        })));
        assert_eq!(desk.filters.registry.search, "vpn");
        assert!(desk.ui.detail.is_some());

        desk.apply(DeskEvent::SessionEntered(Box::new(SessionData {
            identity: Identity {
                user_id: UserId::random(),
                email: "lee@proxima.services".to_string(),
            },
            profile: None,
            tickets: None,
            notifications: None,
        })));
        assert_eq!(desk.filters, Filters::default());
        assert!(desk.ui.detail.is_none());
        assert!(desk.ui.alert.is_none());
        assert_eq!(desk.ui.draft, TicketDraft::default());
        assert_eq!(desk.ui.active_tab, Tab::Home);
    }

    #[test]
    fn test_sign_out_clears_everything() {
        let mut desk = signed_in(Role::Admin);
        desk.apply(DeskEvent::TicketOpened(ticket(2, "VPN slow", TicketStatus::Open)));
        desk.apply(DeskEvent::OpenModal(Modal::CreateTicket));
        desk.apply(DeskEvent::SignedOut);

        assert_eq!(desk.session, SessionPhase::Unauthenticated);
        assert!(desk.profile.is_none());
        assert!(desk.cache.tickets.is_empty());
        assert!(desk.cache.notifications.is_empty());
        assert!(desk.ui.detail.is_none());
        assert_eq!(desk.ui.modal, Modal::None);
        assert_eq!(desk.ui.active_tab, Tab::Home);
    }

    #[test]
    fn test_session_switch_keeps_notice() {
        let mut desk = signed_in(Role::Admin);
        desk.apply(DeskEvent::SessionSwitched {
            notice: "Account created".to_string(),
        });
        assert!(desk.is_loading());
        assert!(desk.cache.tickets.is_empty());
        assert_eq!(desk.ui.alert.as_deref(), Some("Account created"));
    }

    #[test]
    fn test_sign_in_failure_is_inline() {
        let mut desk = Desk::default();
        desk.apply(DeskEvent::NoSession);
        desk.apply(DeskEvent::SignInFailed("Invalid login credentials".to_string()));
        assert_eq!(desk.session, SessionPhase::Unauthenticated);
        assert_eq!(desk.ui.auth_error.as_deref(), Some("Invalid login credentials"));
        assert!(desk.ui.alert.is_none());
    }

    #[test]
    fn test_overlay_toggle_and_outside_click() {
        let mut desk = signed_in(Role::Helper);
        desk.apply(DeskEvent::ToggleOverlay(ActiveOverlay::Sort));
        assert_eq!(desk.ui.overlay, ActiveOverlay::Sort);

        // Opening another menu replaces the first.
        desk.apply(DeskEvent::ToggleOverlay(ActiveOverlay::User));
        assert_eq!(desk.ui.overlay, ActiveOverlay::User);

        desk.apply(DeskEvent::ToggleOverlay(ActiveOverlay::User));
        assert_eq!(desk.ui.overlay, ActiveOverlay::None);

        desk.apply(DeskEvent::ToggleOverlay(ActiveOverlay::FilterStatus));
        desk.apply(DeskEvent::StatusFilterChanged(Some(TicketStatus::Closed)));
        assert_eq!(desk.ui.overlay, ActiveOverlay::None);

        desk.apply(DeskEvent::ToggleOverlay(ActiveOverlay::Notifications));
        desk.apply(DeskEvent::NotificationsCleared);
        assert_eq!(desk.ui.overlay, ActiveOverlay::Notifications);
        desk.apply(DeskEvent::CloseOverlay);
        assert_eq!(desk.ui.overlay, ActiveOverlay::None);
    }

    #[test]
    fn test_detail_tab_requires_a_ticket() {
        let mut desk = signed_in(Role::Helper);
        desk.apply(DeskEvent::Navigate(Tab::Dashboard));
        desk.apply(DeskEvent::Navigate(Tab::Detail));
        assert_eq!(desk.ui.active_tab, Tab::Dashboard);

        desk.apply(DeskEvent::TicketOpened(ticket(2, "VPN slow", TicketStatus::Open)));
        desk.apply(DeskEvent::Navigate(Tab::Tickets));
        desk.apply(DeskEvent::Navigate(Tab::Detail));
        assert_eq!(desk.ui.active_tab, Tab::Detail);
    }

    #[test]
    fn test_modals_are_gated_by_role() {
        let mut helper = signed_in(Role::Helper);
        helper.apply(DeskEvent::OpenModal(Modal::CreateAccount));
        assert_eq!(helper.ui.modal, Modal::None);
        helper.apply(DeskEvent::DeleteRequested(TicketId::new(2)));
        assert_eq!(helper.ui.modal, Modal::None);
        helper.apply(DeskEvent::OpenModal(Modal::CreateTicket));
        assert_eq!(helper.ui.modal, Modal::CreateTicket);

        let mut admin = signed_in(Role::Admin);
        admin.apply(DeskEvent::DeleteRequested(TicketId::new(2)));
        assert_eq!(admin.ui.modal, Modal::ConfirmDelete(TicketId::new(2)));
    }

    #[test]
    fn test_ticket_created_is_prepended() {
        let mut desk = signed_in(Role::Helper);
        desk.apply(DeskEvent::OpenModal(Modal::CreateTicket));
        desk.apply(DeskEvent::DraftEdited(TicketDraft {
            title: "VPN down".to_string(),
            ..TicketDraft::default()
        }));
        desk.apply(DeskEvent::TicketCreated(ticket(4, "VPN down", TicketStatus::Open)));

        assert_eq!(desk.cache.tickets[0].id, TicketId::new(4));
        assert_eq!(desk.ui.modal, Modal::None);
        assert_eq!(desk.ui.draft, TicketDraft::default());
        assert_eq!(desk.ui.active_tab, Tab::Tickets);
        assert_eq!(desk.registry()[0].title, "VPN down");
    }

    #[test]
    fn test_status_change_patches_cache_and_detail() {
        let mut desk = signed_in(Role::Helper);
        desk.apply(DeskEvent::TicketOpened(desk.cache.tickets[1].clone()));
        desk.apply(DeskEvent::ToggleOverlay(ActiveOverlay::Status));
        desk.apply(DeskEvent::StatusChanged {
            id: TicketId::new(2),
            status: TicketStatus::InProgress,
        });

        assert_eq!(
            desk.ticket(TicketId::new(2)).unwrap().status,
            TicketStatus::InProgress
        );
        assert_eq!(desk.ui.detail.unwrap().status, TicketStatus::InProgress);
        assert_eq!(desk.ui.overlay, ActiveOverlay::None);
    }

    #[test]
    fn test_deleting_open_ticket_returns_to_registry() {
        let mut desk = signed_in(Role::Admin);
        desk.apply(DeskEvent::TicketOpened(desk.cache.tickets[1].clone()));
        desk.apply(DeskEvent::DeleteRequested(TicketId::new(2)));
        desk.apply(DeskEvent::TicketDeleted(TicketId::new(2)));

        assert!(desk.ui.detail.is_none());
        assert_eq!(desk.ui.active_tab, Tab::Tickets);
        assert_eq!(desk.ui.modal, Modal::None);
        assert!(desk.ui.alert.is_none());
        assert!(desk.registry().iter().all(|t| t.id != TicketId::new(2)));
    }

    #[test]
    fn test_deleting_other_ticket_keeps_detail() {
        let mut desk = signed_in(Role::Admin);
        desk.apply(DeskEvent::TicketOpened(desk.cache.tickets[0].clone()));
        desk.apply(DeskEvent::TicketDeleted(TicketId::new(1)));
        assert_eq!(desk.ui.detail.unwrap().id, TicketId::new(3));
        assert_eq!(desk.ui.active_tab, Tab::Detail);
    }

    #[test]
    fn test_comment_appends_in_cache_and_detail() {
        let mut desk = signed_in(Role::Helper);
        desk.apply(DeskEvent::TicketOpened(desk.cache.tickets[1].clone()));
        let comment = Comment {
            id: CommentId::new(10),
            ticket_id: TicketId::new(2),
            user_name: "sam".to_string(),
            text: "Rebooted the gateway".to_string(),
            created_at: at(30),
        };
        desk.apply(DeskEvent::CommentAdded(comment.clone()));

        assert_eq!(desk.ticket(TicketId::new(2)).unwrap().comments, vec![comment.clone()]);
        assert_eq!(desk.ui.detail.unwrap().comments, vec![comment]);
    }

    #[test]
    fn test_archive_resolved() {
        let mut desk = signed_in(Role::Admin);
        desk.apply(DeskEvent::TicketOpened(desk.cache.tickets[0].clone()));
        desk.apply(DeskEvent::ResolvedArchived);

        let statuses: Vec<TicketStatus> = desk.cache.tickets.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![TicketStatus::Closed, TicketStatus::Open, TicketStatus::Closed]
        );
        assert_eq!(desk.ui.detail.unwrap().status, TicketStatus::Closed);
    }

    #[test]
    fn test_notification_reads() {
        let mut desk = signed_in(Role::Helper);
        assert_eq!(desk.unread_count(), 2);

        desk.apply(DeskEvent::NotificationRead(NotificationId::new(1)));
        assert_eq!(desk.unread_count(), 1);
        assert!(!desk.cache.notifications[0].is_read);
        assert!(desk.cache.notifications[1].is_read);

        desk.apply(DeskEvent::NotificationsCleared);
        assert_eq!(desk.unread_count(), 0);
    }

    #[test]
    fn test_filters_reset_keeps_search_and_sort() {
        let mut desk = signed_in(Role::Helper);
        desk.apply(DeskEvent::SearchChanged("vpn".to_string()));
        desk.apply(DeskEvent::StatusFilterChanged(Some(TicketStatus::Resolved)));
        desk.apply(DeskEvent::CategoryFilterChanged(Some(Category::Apps)));
        assert_eq!(desk.registry().len(), 1);

        desk.apply(DeskEvent::FiltersReset);
        assert!(!desk.filters.registry.has_filters());
        assert_eq!(desk.filters.registry.search, "vpn");
        assert_eq!(desk.registry().len(), 2);
    }

    #[test]
    fn test_mutation_failure_raises_alert() {
        let mut desk = signed_in(Role::Helper);
        desk.apply(DeskEvent::MutationFailed("Error creating ticket".to_string()));
        assert_eq!(desk.ui.alert.as_deref(), Some("Error creating ticket"));
        desk.apply(DeskEvent::DismissAlert);
        assert!(desk.ui.alert.is_none());
    }

    #[test]
    fn test_dashboard_uses_date_range() {
        let mut desk = signed_in(Role::Helper);
        let now = at(3) + Duration::days(8);
        assert_eq!(desk.dashboard(now).total, 3);
        desk.apply(DeskEvent::DateRangeChanged(DateRange::Last7Days));
        assert_eq!(desk.dashboard(now).total, 0);
    }
}
