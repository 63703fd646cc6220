//! Ticket registry projection: search, filter and sort.

use std::cmp::Reverse;

use crate::define_enum;
use crate::types::{Category, Ticket, TicketStatus};

define_enum! {
    /// Registry ordering.
    SortOrder("sort order") {
        Newest => "newest",
        Oldest => "oldest",
        Priority => "priority",
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Newest
    }
}

impl SortOrder {
    /// Human label for the sort menu.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest first",
            Self::Oldest => "Oldest first",
            Self::Priority => "Priority",
        }
    }
}

/// Inputs of the registry projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryQuery {
    /// Free-text search; blank matches everything.
    pub search: String,
    pub category: Option<Category>,
    pub status: Option<TicketStatus>,
    pub sort: SortOrder,
}

impl RegistryQuery {
    /// Whether a category or status filter is active.
    #[must_use]
    pub const fn has_filters(&self) -> bool {
        self.category.is_some() || self.status.is_some()
    }

    /// Whether one ticket passes the search and filters.
    ///
    /// Search is a case-insensitive substring match against the title, the
    /// decimal id and the description.
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.category.is_some_and(|c| c != ticket.category) {
            return false;
        }
        if self.status.is_some_and(|s| s != ticket.status) {
            return false;
        }

        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        ticket.title.to_lowercase().contains(&needle)
            || ticket.id.to_string().contains(&needle)
            || ticket.description.to_lowercase().contains(&needle)
    }

    /// Filter and sort `tickets`.
    ///
    /// Sorting is stable: tickets that compare equal keep their cache order.
    #[must_use]
    pub fn apply<'a>(&self, tickets: &'a [Ticket]) -> Vec<&'a Ticket> {
        let mut selected: Vec<&Ticket> = tickets.iter().filter(|t| self.matches(t)).collect();
        match self.sort {
            SortOrder::Newest => selected.sort_by_key(|t| Reverse(t.created_at)),
            SortOrder::Oldest => selected.sort_by_key(|t| t.created_at),
            SortOrder::Priority => selected.sort_by_key(|t| Reverse(t.priority.rank())),
        }
        selected
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{TicketId, TicketPriority, TicketType};
    use chrono::{Duration, TimeZone, Utc};

    fn ticket(id: i64, title: &str, status: TicketStatus, priority: TicketPriority) -> Ticket {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        Ticket {
            id: TicketId::new(id),
            title: title.to_string(),
            ticket_type: TicketType::Issue,
            category: Category::ServerSetup,
            priority,
            status,
            description: format!("Details for {title}"),
            created_by: None,
            created_at: base + Duration::hours(id),
            comments: Vec::new(),
        }
    }

    fn ids(tickets: &[&Ticket]) -> Vec<i64> {
        tickets.iter().map(|t| t.id.as_i64()).collect()
    }

    #[test]
    fn test_status_filter_and_search_combine() {
        let tickets = vec![
            ticket(1, "VPN outage", TicketStatus::Closed, TicketPriority::High),
            ticket(2, "VPN slow", TicketStatus::Open, TicketPriority::Low),
        ];
        let query = RegistryQuery {
            search: "vpn".to_string(),
            status: Some(TicketStatus::Closed),
            ..RegistryQuery::default()
        };
        assert_eq!(ids(&query.apply(&tickets)), vec![1]);
    }

    #[test]
    fn test_search_matches_title_id_and_description() {
        let tickets = vec![
            ticket(7, "Login loop", TicketStatus::Open, TicketPriority::Low),
            ticket(12, "Billing page", TicketStatus::Open, TicketPriority::Low),
            ticket(120, "Dark mode", TicketStatus::Open, TicketPriority::Low),
        ];
        let search = |s: &str| {
            let query = RegistryQuery {
                search: s.to_string(),
                ..RegistryQuery::default()
            };
            ids(&query.apply(&tickets))
        };

        assert_eq!(search("LOGIN"), vec![7]);
        // "12" is a prefix of 120 as well.
        assert_eq!(search("12"), vec![120, 12]);
        assert_eq!(search("details for dark"), vec![120]);
        assert_eq!(search("   "), vec![120, 12, 7]);
        assert!(search("nothing like this").is_empty());
    }

    #[test]
    fn test_category_filter() {
        let mut billing = ticket(1, "Invoice", TicketStatus::Open, TicketPriority::Low);
        billing.category = Category::Billing;
        let tickets = vec![billing, ticket(2, "Reboot", TicketStatus::Open, TicketPriority::Low)];
        let query = RegistryQuery {
            category: Some(Category::Billing),
            ..RegistryQuery::default()
        };
        assert!(query.has_filters());
        assert_eq!(ids(&query.apply(&tickets)), vec![1]);
    }

    #[test]
    fn test_sort_orders() {
        let tickets = vec![
            ticket(4, "d", TicketStatus::Open, TicketPriority::Medium),
            ticket(3, "c", TicketStatus::Open, TicketPriority::Critical),
            ticket(2, "b", TicketStatus::Open, TicketPriority::Medium),
            ticket(1, "a", TicketStatus::Open, TicketPriority::High),
        ];
        let sorted = |sort| {
            let query = RegistryQuery {
                sort,
                ..RegistryQuery::default()
            };
            ids(&query.apply(&tickets))
        };

        assert_eq!(sorted(SortOrder::Newest), vec![4, 3, 2, 1]);
        assert_eq!(sorted(SortOrder::Oldest), vec![1, 2, 3, 4]);
        // Equal priorities keep cache order (4 before 2).
        assert_eq!(sorted(SortOrder::Priority), vec![3, 1, 4, 2]);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let tickets = vec![
            ticket(1, "VPN outage", TicketStatus::Closed, TicketPriority::High),
            ticket(2, "VPN slow", TicketStatus::Open, TicketPriority::Critical),
            ticket(3, "Printer", TicketStatus::Open, TicketPriority::Critical),
        ];
        let query = RegistryQuery {
            search: "p".to_string(),
            sort: SortOrder::Priority,
            ..RegistryQuery::default()
        };
        let first: Vec<Ticket> = query.apply(&tickets).into_iter().cloned().collect();
        let second = query.apply(&first);
        assert_eq!(ids(&second), ids(&first.iter().collect::<Vec<_>>()));
    }
}
