//! HTTP client for the external scheduling solver.

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use shiftplan_db::models::{AssignmentRecord, AssignmentStatus, PartOfDay};

use crate::proposal::ProposedAssignment;

/// Errors from the solver call.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Failed to build the HTTP client.
    #[error("invalid solver client configuration: {0}")]
    Configuration(#[source] reqwest::Error),

    /// Transport-level failure or timeout; the solver never answered.
    #[error("solver unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The solver answered with a non-success HTTP status.
    #[error("solver returned HTTP {status}")]
    Http { status: StatusCode },

    /// The response body could not be decoded.
    #[error("solver response decode failed: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Outcome reported by the solver for one solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Success,
    Feasible,
    Infeasible,
    Timeout,
    Error,
}

impl SolverStatus {
    /// Whether the returned assignments may be written back.
    #[must_use]
    pub fn is_usable(self) -> bool {
        matches!(self, Self::Success | Self::Feasible)
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Feasible => write!(f, "feasible"),
            Self::Infeasible => write!(f, "infeasible"),
            Self::Timeout => write!(f, "timeout"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One roster slot as the solver sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSlot {
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub part_of_day: PartOfDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<Uuid>,
}

impl SolverSlot {
    #[must_use]
    pub fn from_record(record: &AssignmentRecord) -> Self {
        Self {
            employee_id: record.employee_id,
            date: record.date,
            part_of_day: record.part_of_day,
            service_id: record.service_id,
        }
    }
}

/// Request payload for a solve call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    pub roster_id: Uuid,
    /// Planner-fixed assignments the solver must respect.
    pub fixed_assignments: Vec<SolverSlot>,
    /// Blocked or unavailable slots the solver may not fill.
    pub blocked_slots: Vec<SolverSlot>,
    /// Open slots the solver assigns.
    pub editable_slots: Vec<SolverSlot>,
    #[serde(default)]
    pub constraints: JsonValue,
}

impl SolveRequest {
    /// Partition the roster's current records into the solver's view.
    #[must_use]
    pub fn from_records(
        roster_id: Uuid,
        records: &[AssignmentRecord],
        constraints: JsonValue,
    ) -> Self {
        let mut fixed_assignments = Vec::new();
        let mut blocked_slots = Vec::new();
        let mut editable_slots = Vec::new();

        for record in records {
            let slot = SolverSlot::from_record(record);
            match record.status {
                AssignmentStatus::Fixed => fixed_assignments.push(slot),
                AssignmentStatus::Blocked | AssignmentStatus::Unavailable => {
                    blocked_slots.push(slot);
                }
                AssignmentStatus::Open => editable_slots.push(slot),
            }
        }

        Self {
            roster_id,
            fixed_assignments,
            blocked_slots,
            editable_slots,
            constraints,
        }
    }
}

/// Response payload of a solve call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResponse {
    pub assignments: Vec<ProposedAssignment>,
    pub solver_status: SolverStatus,
}

/// Synchronous request/response client for the solver service.
pub struct SolverClient {
    http: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl SolverClient {
    /// Build a client with the given call timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SolverError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(SolverError::Configuration)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            bearer_token: None,
        })
    }

    /// Authenticate solve calls with a bearer token.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// POST the solve request and decode the solver's answer.
    ///
    /// Transport failures and timeouts come back as
    /// [`SolverError::Unreachable`]; the caller aborts before any write.
    pub async fn solve(&self, request: &SolveRequest) -> Result<SolveResponse, SolverError> {
        let url = format!("{}/solve", self.base_url);
        debug!(
            roster_id = %request.roster_id,
            editable = request.editable_slots.len(),
            fixed = request.fixed_assignments.len(),
            blocked = request.blocked_slots.len(),
            "Calling solver"
        );

        let mut builder = self.http.post(&url).json(request);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(SolverError::Unreachable)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SolverError::Http { status });
        }

        response
            .json::<SolveResponse>()
            .await
            .map_err(SolverError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shiftplan_db::models::AssignmentSource;

    fn record(employee: u128, status: AssignmentStatus) -> AssignmentRecord {
        AssignmentRecord {
            id: Uuid::from_u128(employee + 100),
            roster_id: Uuid::from_u128(1),
            employee_id: Uuid::from_u128(employee),
            date: NaiveDate::from_ymd_opt(2025, 11, 24).unwrap(),
            part_of_day: PartOfDay::Morning,
            service_id: Some(Uuid::from_u128(0xA)),
            status,
            source: AssignmentSource::Manual,
            confidence: None,
            run_id: None,
            reason_note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn request_partitions_records_by_status() {
        let records = vec![
            record(1, AssignmentStatus::Open),
            record(2, AssignmentStatus::Fixed),
            record(3, AssignmentStatus::Blocked),
            record(4, AssignmentStatus::Unavailable),
        ];

        let request =
            SolveRequest::from_records(Uuid::from_u128(1), &records, JsonValue::Null);

        assert_eq!(request.editable_slots.len(), 1);
        assert_eq!(request.fixed_assignments.len(), 1);
        assert_eq!(request.blocked_slots.len(), 2);
    }

    #[test]
    fn only_success_and_feasible_are_usable() {
        assert!(SolverStatus::Success.is_usable());
        assert!(SolverStatus::Feasible.is_usable());
        assert!(!SolverStatus::Infeasible.is_usable());
        assert!(!SolverStatus::Timeout.is_usable());
        assert!(!SolverStatus::Error.is_usable());
    }

    #[test]
    fn solver_status_deserializes_snake_case() {
        let status: SolverStatus = serde_json::from_str("\"infeasible\"").unwrap();
        assert_eq!(status, SolverStatus::Infeasible);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            SolverClient::new("http://solver.local/", Duration::from_secs(35)).unwrap();
        assert_eq!(client.base_url, "http://solver.local");
    }
}
