//! Closed enumerations shared with the backend.
//!
//! Every value is stored as its human-readable label (for example
//! `"In Progress"`), so the serde name, `Display` and `FromStr` all use the
//! same wire string.

/// A string that is not one of the labels of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?}")]
pub struct UnknownVariant {
    /// Name of the enumeration that rejected the value.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Macro to define a closed enumeration with fixed wire labels.
///
/// Generates the enum plus:
/// - serde renames so each variant (de)serializes as its label
/// - `ALL` in declaration order, `as_str()`, `Display`
/// - `FromStr` returning [`UnknownVariant`] for anything else
#[macro_export]
macro_rules! define_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every value in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire label of this value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::status::UnknownVariant;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err($crate::types::status::UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

define_enum! {
    /// What kind of problem a ticket describes.
    TicketType("ticket type") {
        Incident => "Incident",
        Outage => "Outage",
        Bug => "Bug",
        Issue => "Issue",
        FeatureRequest => "Feature Request",
    }
}

define_enum! {
    /// Ticket urgency.
    TicketPriority("ticket priority") {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Critical => "Critical",
    }
}

define_enum! {
    /// Ticket lifecycle status.
    TicketStatus("ticket status") {
        Open => "Open",
        InProgress => "In Progress",
        Resolved => "Resolved",
        Closed => "Closed",
        Upcoming => "Upcoming",
        Planned => "Planned",
    }
}

define_enum! {
    /// Product area a ticket belongs to.
    Category("category") {
        GettingStarted => "Getting Started",
        Apps => "Apps",
        AccountSettings => "Account Settings",
        Billing => "Billing",
        Interface => "Interface",
        TrustAndSafety => "Trust & Safety",
        ServerSetup => "Server Setup",
    }
}

define_enum! {
    /// Staff role stored on a profile.
    Role("role") {
        Helper => "Helper",
        Admin => "Admin",
    }
}

// Defaults are the preselected values of the new-ticket and new-account forms.
macro_rules! derive_default {
    ($($name:ident => $variant:ident),+ $(,)?) => {
        $(
            impl Default for $name {
                fn default() -> Self {
                    Self::$variant
                }
            }
        )+
    };
}

derive_default! {
    TicketType => Incident,
    TicketPriority => Medium,
    TicketStatus => Open,
    Category => Apps,
    Role => Helper,
}

impl TicketPriority {
    /// Sort rank: `Critical = 3 > High = 2 > Medium = 1 > Low = 0`.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

impl TicketStatus {
    /// Resolved or closed.
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    /// Open or being worked on.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::InProgress)
    }

    /// Scheduled for later.
    #[must_use]
    pub const fn is_upcoming(self) -> bool {
        matches!(self, Self::Upcoming | Self::Planned)
    }
}
