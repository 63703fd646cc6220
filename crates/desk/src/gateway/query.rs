//! Table query builder rendered as PostgREST query parameters.

use std::fmt;

/// Backend tables the desk reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    Tickets,
    Comments,
    Notifications,
}

impl Table {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Tickets => "tickets",
            Self::Comments => "comments",
            Self::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An equality filter on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqFilter {
    pub column: String,
    pub value: String,
}

/// Ordering on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Selection over a single table.
///
/// ```rust,ignore
/// let query = TableQuery::from(Table::Notifications)
///     .eq("user_id", user_id)
///     .order("created_at", false)
///     .limit(20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: Table,
    pub columns: String,
    pub filters: Vec<EqFilter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl From<Table> for TableQuery {
    fn from(table: Table) -> Self {
        Self {
            table,
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }
}

impl TableQuery {
    /// Columns to return, e.g. `id` or `*, comments(*)`.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    #[must_use]
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.filters.push(EqFilter {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    #[must_use]
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Column list split on top-level commas, whitespace removed.
    #[must_use]
    pub fn column_list(&self) -> Vec<String> {
        self.columns
            .split(',')
            .map(|c| c.chars().filter(|ch| !ch.is_whitespace()).collect::<String>())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Query pairs as PostgREST expects them.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.column_list().join(","))];
        for filter in &self.filters {
            params.push((filter.column.clone(), format!("eq.{}", filter.value)));
        }
        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Filter and order only, for `PATCH` and `DELETE`.
    #[must_use]
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|f| (f.column.clone(), format!("eq.{}", f.value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(params: &[(String, String)]) -> Vec<(&str, &str)> {
        params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_ticket_list_params() {
        let query = TableQuery::from(Table::Tickets)
            .select("*, comments(*)")
            .order("created_at", false);
        assert_eq!(
            pairs(&query.to_params()),
            vec![("select", "*,comments(*)"), ("order", "created_at.desc")]
        );
    }

    #[test]
    fn test_notification_feed_params() {
        let query = TableQuery::from(Table::Notifications)
            .eq("user_id", "7f1c")
            .eq("is_read", false)
            .order("created_at", false)
            .limit(20);
        assert_eq!(
            pairs(&query.to_params()),
            vec![
                ("select", "*"),
                ("user_id", "eq.7f1c"),
                ("is_read", "eq.false"),
                ("order", "created_at.desc"),
                ("limit", "20"),
            ]
        );
        assert_eq!(
            pairs(&query.filter_params()),
            vec![("user_id", "eq.7f1c"), ("is_read", "eq.false")]
        );
    }

    #[test]
    fn test_by_id() {
        let query = TableQuery::from(Table::Tickets).eq("id", 5);
        assert_eq!(pairs(&query.filter_params()), vec![("id", "eq.5")]);
        assert_eq!(query.table.to_string(), "tickets");
    }
}
