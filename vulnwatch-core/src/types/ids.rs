use serde::{Deserialize, Serialize};

macro_rules! tracker_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

tracker_id!(
    /// Tracker-side product identifier; one product per monitored project.
    ProductId
);

tracker_id!(
    /// Tracker-side engagement identifier. Join key between engagements and
    /// locally persisted images.
    EngagementId
);

tracker_id!(
    /// Tracker-side endpoint identifier attached to uploaded reports.
    EndpointId
);

tracker_id!(
    /// Identifier the tracker assigns to an imported report.
    TestId
);
