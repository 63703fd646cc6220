//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// CSS modifier for a status, priority or type badge.
///
/// Takes the wire label, so `{{ ticket.priority|badge }}` and
/// `{{ ticket.status|badge }}` both work.
#[askama::filter_fn]
pub fn badge(value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(badge_class(&value.to_string()))
}

/// Badge colour per label. Unknown labels get the neutral badge.
fn badge_class(label: &str) -> &'static str {
    match label {
        "Critical" | "Outage" => "badge-red",
        "High" => "badge-orange",
        "Medium" => "badge-yellow",
        "Low" => "badge-green",
        "Open" => "badge-blue",
        "In Progress" => "badge-purple",
        "Resolved" => "badge-emerald",
        "Closed" => "badge-gray badge-struck",
        "Upcoming" => "badge-cyan",
        "Planned" => "badge-pink",
        "Bug" => "badge-amber",
        "Incident" => "badge-slate",
        "Issue" => "badge-indigo",
        _ => "badge-gray",
    }
}

/// First letter of a name, upper-cased, for an avatar.
///
/// Usage in templates: `{{ comment.user_name|initial }}`
#[askama::filter_fn]
pub fn initial(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(value
        .to_string()
        .trim()
        .chars()
        .next()
        .map_or_else(|| "?".to_string(), |c| c.to_uppercase().collect()))
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}
