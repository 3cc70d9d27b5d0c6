//! The correction-review workflow.
//!
//! A correction request moves `pending → accepted → applied`, or
//! `pending → rejected`; nothing ever moves backwards. Review transitions
//! are Admin-gated, each one is a discrete backend call, and the server's
//! returned record is the only thing that ever updates local state — the
//! client never flips a status optimistically, so the dashboard badge
//! cannot drift from the authoritative record.
//!
//! The SLA deadline is fixed at creation. "Overdue" is derived from the
//! clock on every read; it is never stored.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::error::FactKitError;
use crate::role::Role;
use crate::{Client, FactKitResult};

pub(crate) const PENDING_PATH: &str = "/admin/corrections/pending";

/// Review lifecycle of a correction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CorrectionStatus {
    /// Awaiting review. The only state the SLA clock applies to.
    Pending,
    /// Approved by a reviewer; the correction still has to be applied.
    Accepted,
    /// Declined. Terminal.
    Rejected,
    /// Published to the fact check. Terminal.
    Applied,
}

impl CorrectionStatus {
    /// Whether the workflow permits moving from `self` to `next`.
    ///
    /// Transitions only go forward: `Pending` may be reviewed, `Accepted`
    /// may be applied, terminal states go nowhere.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted | Self::Rejected) | (Self::Accepted, Self::Applied)
        )
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Applied)
    }
}

/// How substantial a requested correction is.
///
/// The set is open on the backend; unknown kinds are carried through
/// verbatim rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CorrectionType {
    /// Typo-level fix, no change in meaning.
    Minor,
    /// Changes the substance or verdict of the fact check.
    Substantial,
    /// A kind this client version does not know about.
    Other(String),
}

impl From<String> for CorrectionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "minor" => Self::Minor,
            "substantial" => Self::Substantial,
            _ => Self::Other(value),
        }
    }
}

impl From<CorrectionType> for String {
    fn from(value: CorrectionType) -> Self {
        match value {
            CorrectionType::Minor => "minor".to_string(),
            CorrectionType::Substantial => "substantial".to_string(),
            CorrectionType::Other(other) => other,
        }
    }
}

/// A correction request as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRequest {
    /// Stable id of the request.
    pub id: Uuid,
    /// The fact check this correction targets.
    pub fact_check_id: Uuid,
    /// Kind of correction requested.
    pub correction_type: CorrectionType,
    /// Free-form description from the requester.
    pub request_details: String,
    /// Current workflow status.
    pub status: CorrectionStatus,
    /// Review deadline, fixed at creation.
    pub sla_deadline: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last transition timestamp.
    pub updated_at: DateTime<Utc>,
}

impl CorrectionRequest {
    /// Whether this request has blown its SLA: still pending with the
    /// deadline in the past. Derived, never stored.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == CorrectionStatus::Pending && now > self.sla_deadline
    }
}

/// The pending review queue, with its counts derived from the list itself.
///
/// The backend also reports counts, but they are recomputed here from the
/// fetched records so a badge can never disagree with the list it sits
/// next to.
#[derive(Debug, Clone)]
pub struct PendingCorrections {
    corrections: Vec<CorrectionRequest>,
    fetched_at: DateTime<Utc>,
}

impl PendingCorrections {
    /// Builds the queue view from fetched records, evaluated at `now`.
    #[must_use]
    pub fn new(mut corrections: Vec<CorrectionRequest>, now: DateTime<Utc>) -> Self {
        // Only pending items belong in the review queue, whatever the
        // endpoint returned.
        corrections.retain(|c| c.status == CorrectionStatus::Pending);
        corrections.sort_by_key(|c| c.sla_deadline);
        Self {
            corrections,
            fetched_at: now,
        }
    }

    /// The pending records, oldest deadline first.
    #[must_use]
    pub fn corrections(&self) -> &[CorrectionRequest] {
        &self.corrections
    }

    /// Number of pending requests.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.corrections.len()
    }

    /// Number of pending requests past their SLA deadline.
    #[must_use]
    pub fn overdue_count(&self) -> usize {
        self.corrections
            .iter()
            .filter(|c| c.is_overdue(self.fetched_at))
            .count()
    }

    /// Whether the queue is empty (the badge disappears).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }
}

/// Wire shape of the pending-list endpoint. The counts are accepted but
/// ignored in favor of client-side derivation.
#[derive(Deserialize)]
struct PendingCorrectionsResponse {
    corrections: Vec<CorrectionRequest>,
    #[allow(dead_code)]
    total_count: usize,
    #[allow(dead_code)]
    overdue_count: usize,
}

impl Client {
    /// Fetches the pending correction queue. Admin-only.
    ///
    /// # Errors
    ///
    /// Returns [`FactKitError::Authorization`] before any network call if
    /// the current user is below Admin; propagates auth/network failures.
    pub async fn list_pending_corrections(&self) -> FactKitResult<PendingCorrections> {
        self.require_role(Role::Admin)?;
        let response: PendingCorrectionsResponse = self
            .send_authorized_json::<(), _>(Method::GET, PENDING_PATH, None, Role::Admin)
            .await?;
        Ok(PendingCorrections::new(response.corrections, Utc::now()))
    }

    /// Accepts a pending correction.
    ///
    /// # Errors
    ///
    /// See [`Self::transition_correction`].
    pub async fn accept_correction(
        &self,
        correction: &CorrectionRequest,
    ) -> FactKitResult<CorrectionRequest> {
        self.transition_correction(correction, CorrectionStatus::Accepted, "accept")
            .await
    }

    /// Rejects a pending correction.
    ///
    /// # Errors
    ///
    /// See [`Self::transition_correction`].
    pub async fn reject_correction(
        &self,
        correction: &CorrectionRequest,
    ) -> FactKitResult<CorrectionRequest> {
        self.transition_correction(correction, CorrectionStatus::Rejected, "reject")
            .await
    }

    /// Applies an accepted correction to its fact check.
    ///
    /// # Errors
    ///
    /// See [`Self::transition_correction`].
    pub async fn apply_correction(
        &self,
        correction: &CorrectionRequest,
    ) -> FactKitResult<CorrectionRequest> {
        self.transition_correction(correction, CorrectionStatus::Applied, "apply")
            .await
    }

    /// Runs one review transition as a discrete backend call and returns
    /// the server's record, which replaces any local copy.
    ///
    /// # Errors
    ///
    /// Returns [`FactKitError::Authorization`] below Admin,
    /// [`FactKitError::InvalidTransition`] when the workflow forbids the
    /// move (checked before the request is sent), and propagates network
    /// failures.
    async fn transition_correction(
        &self,
        correction: &CorrectionRequest,
        to: CorrectionStatus,
        action: &str,
    ) -> FactKitResult<CorrectionRequest> {
        self.require_role(Role::Admin)?;
        if !correction.status.can_transition_to(to) {
            return Err(FactKitError::InvalidTransition {
                from: correction.status,
                to,
            });
        }
        let path = format!("/admin/corrections/{}/{action}", correction.id);
        let updated: CorrectionRequest = self
            .send_authorized_json::<(), _>(Method::POST, &path, None, Role::Admin)
            .await?;
        tracing::info!(id = %updated.id, status = %updated.status, "correction transitioned");
        Ok(updated)
    }

    pub(crate) fn require_role(&self, required: Role) -> FactKitResult<()> {
        let Some(actual) = self.session.snapshot().role() else {
            return Err(FactKitError::NotAuthenticated);
        };
        if actual.satisfies(required) {
            Ok(())
        } else {
            Err(FactKitError::Authorization { required, actual })
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use test_case::test_case;

    use super::*;

    fn correction(status: CorrectionStatus, sla_offset: Duration) -> CorrectionRequest {
        let now = Utc::now();
        CorrectionRequest {
            id: Uuid::new_v4(),
            fact_check_id: Uuid::new_v4(),
            correction_type: CorrectionType::Minor,
            request_details: "typo in the second paragraph".to_string(),
            status,
            sla_deadline: now + sla_offset,
            created_at: now - Duration::days(1),
            updated_at: now,
        }
    }

    #[test_case(CorrectionStatus::Pending, CorrectionStatus::Accepted, true)]
    #[test_case(CorrectionStatus::Pending, CorrectionStatus::Rejected, true)]
    #[test_case(CorrectionStatus::Accepted, CorrectionStatus::Applied, true)]
    #[test_case(CorrectionStatus::Pending, CorrectionStatus::Applied, false; "pending cannot skip to applied")]
    #[test_case(CorrectionStatus::Accepted, CorrectionStatus::Pending, false; "no moving backwards")]
    #[test_case(CorrectionStatus::Rejected, CorrectionStatus::Accepted, false; "rejected is terminal")]
    #[test_case(CorrectionStatus::Applied, CorrectionStatus::Pending, false; "applied is terminal")]
    fn transitions_only_go_forward(from: CorrectionStatus, to: CorrectionStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn overdue_is_pending_with_deadline_in_the_past() {
        let now = Utc::now();
        assert!(correction(CorrectionStatus::Pending, Duration::hours(-2)).is_overdue(now));
        assert!(!correction(CorrectionStatus::Pending, Duration::hours(2)).is_overdue(now));
        // A reviewed correction is never overdue, however old.
        assert!(!correction(CorrectionStatus::Applied, Duration::hours(-48)).is_overdue(now));
        assert!(!correction(CorrectionStatus::Rejected, Duration::hours(-48)).is_overdue(now));
    }

    #[test]
    fn queue_counts_are_derived_from_the_list() {
        let now = Utc::now();
        let queue = PendingCorrections::new(
            vec![
                correction(CorrectionStatus::Pending, Duration::hours(-1)),
                correction(CorrectionStatus::Pending, Duration::hours(1)),
                // Applied records are excluded even if the endpoint leaks them.
                correction(CorrectionStatus::Applied, Duration::hours(-1)),
            ],
            now,
        );
        assert_eq!(queue.total_count(), 2);
        assert_eq!(queue.overdue_count(), 1);
        assert!(!queue.is_empty());

        let empty = PendingCorrections::new(vec![], now);
        assert!(empty.is_empty());
        assert_eq!(empty.overdue_count(), 0);
    }

    #[test]
    fn unknown_correction_types_round_trip() {
        let parsed: CorrectionType = serde_json::from_str("\"retraction\"").unwrap();
        assert_eq!(parsed, CorrectionType::Other("retraction".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"retraction\"");

        let minor: CorrectionType = serde_json::from_str("\"minor\"").unwrap();
        assert_eq!(minor, CorrectionType::Minor);
    }
}
