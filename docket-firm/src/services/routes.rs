//! Relationship and report routes merged under `/clients` and `/cases`.
//!
//! Every traversal goes through the parent first, so `/cases/{id}/deadlines`
//! for another firm's case is a 404, not an empty list.

use axum::{
    extract::Path,
    routing::{get, post},
    Json, Router,
};
use docket_axum::DocketAxumError;
use docket_core::{Query, RecordId};
use serde::Serialize;

use crate::entities::{Case, CaseStatus, Deadline, Document, TimeEntry};

use super::FirmServices;

#[derive(Debug, Serialize)]
pub struct CaseTime {
    pub case_id: RecordId,
    pub total_minutes: i64,
    pub billable_minutes: i64,
}

pub fn client_routes(services: &FirmServices) -> Router<()> {
    let s = services.clone();
    Router::new().route(
        "/{id}/cases",
        get(move |Path(id): Path<String>| {
            let s = s.clone();
            async move {
                let cases = s
                    .clients
                    .related(&RecordId::from(id.as_str()), &s.cases, |c: &Case| &c.client_id)
                    .await?;
                Ok::<_, DocketAxumError>(Json(cases))
            }
        }),
    )
}

pub fn case_routes(services: &FirmServices) -> Router<()> {
    let deadlines = {
        let s = services.clone();
        move |Path(id): Path<String>| {
            let s = s.clone();
            async move {
                let mut rows = s
                    .cases
                    .related(&RecordId::from(id.as_str()), &s.deadlines, |d: &Deadline| &d.case_id)
                    .await?;
                rows.sort_by_key(|d| d.due_on);
                Ok::<_, DocketAxumError>(Json(rows))
            }
        }
    };

    let documents = {
        let s = services.clone();
        move |Path(id): Path<String>| {
            let s = s.clone();
            async move {
                let rows = s
                    .cases
                    .related(&RecordId::from(id.as_str()), &s.documents, |d: &Document| &d.case_id)
                    .await?;
                Ok::<_, DocketAxumError>(Json(rows))
            }
        }
    };

    let time = {
        let s = services.clone();
        move |Path(id): Path<String>| {
            let s = s.clone();
            async move {
                let case_id = RecordId::from(id.as_str());
                s.cases.get(&case_id).await?;

                let on_case = |billable_only: bool| {
                    let case_id = case_id.clone();
                    Query::all().filter(move |t: &TimeEntry| t.case_id == case_id && (t.billable || !billable_only))
                };
                let total_minutes = s.time_entries.sum(on_case(false), |t| t.minutes).await?;
                let billable_minutes = s.time_entries.sum(on_case(true), |t| t.minutes).await?;

                Ok::<_, DocketAxumError>(Json(CaseTime {
                    case_id,
                    total_minutes,
                    billable_minutes,
                }))
            }
        }
    };

    let close = {
        let s = services.clone();
        move |Path(id): Path<String>| {
            let s = s.clone();
            async move {
                let case = s
                    .cases
                    .patch(&RecordId::from(id.as_str()), |c| c.status = CaseStatus::Closed)
                    .await?;
                tracing::info!(case_id = %case.id, "case closed");
                Ok::<_, DocketAxumError>(Json(case))
            }
        }
    };

    Router::new()
        .route("/{id}/deadlines", get(deadlines))
        .route("/{id}/documents", get(documents))
        .route("/{id}/time", get(time))
        .route("/{id}/close", post(close))
}
