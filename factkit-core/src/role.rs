//! Platform roles.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A user's role on the platform.
///
/// Roles form a total order — every gating decision is "role at least R",
/// never an unordered set check. Declaration order is the order:
/// `Submitter < Reviewer < Admin < SuperAdmin`.
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
    Display,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Can submit claims for review.
    Submitter,
    /// Can review and fact-check submitted claims.
    Reviewer,
    /// Can administer users and the correction workflow.
    Admin,
    /// Full platform control, including other admins.
    SuperAdmin,
}

impl Role {
    /// Whether this role satisfies a requirement of at least `required`.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }

    /// Admin or above.
    #[must_use]
    pub fn is_admin(self) -> bool {
        self.satisfies(Self::Admin)
    }
}
