use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::cv::completeness::{compute_completeness_report, CompletenessReport};
use crate::engine::flatten::{flatten, unflatten};
use crate::engine::merge::{apply_field_rules, FieldUpdate};
use crate::engine::rules::Issue;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FieldPatchRequest {
    pub updates: Vec<FieldUpdate>,
}

#[derive(Debug, Serialize)]
pub struct FieldPatchResponse {
    pub document: Value,
    pub changed: bool,
    pub issues: Vec<Issue>,
    pub completeness_delta: f64,
}

#[derive(Debug, Serialize)]
pub struct CvResponse {
    pub document: Value,
    pub filled_keys: Vec<String>,
    pub completeness: CompletenessReport,
}

/// PATCH /api/v1/cv/:session_id/fields
///
/// Runs the merge engine over the session snapshot. A batch carrying any
/// error-level issue is not persisted — the last-known-good document is
/// kept and the issues are returned as a 422.
pub async fn handle_patch_fields(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<FieldPatchRequest>,
) -> Result<Json<FieldPatchResponse>, AppError> {
    if req.updates.is_empty() {
        return Err(AppError::Validation("updates listesi boş olamaz".into()));
    }

    let current = state
        .store
        .load(session_id)
        .await
        .map_err(AppError::Internal)?
        .unwrap_or_else(|| json!({}));

    let outcome = apply_field_rules(
        &current,
        &req.updates,
        state.catalog.rules(),
        state.catalog.allowed_keys(),
    );

    if outcome.has_errors() {
        let errors: Vec<_> = outcome.issues.iter().filter(|i| i.is_error()).collect();
        return Err(AppError::UnprocessableEntity(
            serde_json::to_string(&errors).unwrap_or_default(),
        ));
    }

    let score_before =
        compute_completeness_report(&flatten(&current), &state.catalog).overall_score;
    let score_after =
        compute_completeness_report(&outcome.document, &state.catalog).overall_score;

    let document = unflatten(&outcome.document);
    if outcome.changed {
        state
            .store
            .upsert(session_id, &document)
            .await
            .map_err(AppError::Internal)?;
    }
    let accepted = outcome.accepted_keys(&req.updates);
    state
        .store
        .mark_filled(session_id, &accepted)
        .await
        .map_err(AppError::Internal)?;

    info!(
        "Merged {} update(s) for session {session_id} ({} warning(s))",
        req.updates.len(),
        outcome.issues.len()
    );

    Ok(Json(FieldPatchResponse {
        document,
        changed: outcome.changed,
        issues: outcome.issues,
        completeness_delta: score_after - score_before,
    }))
}

/// GET /api/v1/cv/:session_id
pub async fn handle_get_cv(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CvResponse>, AppError> {
    let document = state
        .store
        .load(session_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

    let mut filled_keys: Vec<String> = state
        .store
        .filled_keys(session_id)
        .await
        .map_err(AppError::Internal)?
        .into_iter()
        .collect();
    filled_keys.sort();

    let completeness = compute_completeness_report(&flatten(&document), &state.catalog);

    Ok(Json(CvResponse {
        document,
        filled_keys,
        completeness,
    }))
}

/// GET /api/v1/cv/:session_id/completeness
pub async fn handle_get_completeness(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CompletenessReport>, AppError> {
    let document = state
        .store
        .load(session_id)
        .await
        .map_err(AppError::Internal)?
        .unwrap_or_else(|| json!({}));
    Ok(Json(compute_completeness_report(
        &flatten(&document),
        &state.catalog,
    )))
}

/// GET /api/v1/catalog
pub async fn handle_get_catalog(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "fields": state.catalog.fields() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::config::Config;
    use crate::store::InMemoryStore;
    use std::sync::Arc;

    fn test_state() -> AppState {
        AppState {
            store: Arc::new(InMemoryStore::default()),
            catalog: Arc::new(default_catalog()),
            config: Config::for_tests(),
        }
    }

    fn patch(updates: Vec<(&str, Value)>) -> FieldPatchRequest {
        FieldPatchRequest {
            updates: updates
                .into_iter()
                .map(|(key, value)| FieldUpdate {
                    key: key.to_string(),
                    value,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_patch_persists_and_marks_filled() {
        let state = test_state();
        let session = Uuid::new_v4();
        let response = handle_patch_fields(
            State(state.clone()),
            Path(session),
            Json(patch(vec![("contact.phone", json!("0532 123 45 67"))])),
        )
        .await
        .unwrap();

        assert!(response.0.changed);
        assert_eq!(
            response.0.document["contact"]["phone"],
            json!("+905321234567")
        );
        assert!(response.0.completeness_delta > 0.0);

        let stored = state.store.load(session).await.unwrap().unwrap();
        assert_eq!(stored["contact"]["phone"], json!("+905321234567"));
        let filled = state.store.filled_keys(session).await.unwrap();
        assert!(filled.contains("contact.phone"));
    }

    #[tokio::test]
    async fn test_patch_with_error_keeps_last_known_good() {
        let state = test_state();
        let session = Uuid::new_v4();
        let good = json!({ "personal": { "fullName": "Ayşe Yılmaz" } });
        state.store.upsert(session, &good).await.unwrap();

        let result = handle_patch_fields(
            State(state.clone()),
            Path(session),
            Json(patch(vec![
                ("personal.fullName", json!("  ")),
                ("contact.phone", json!("0532 123 45 67")),
            ])),
        )
        .await;

        assert!(matches!(result, Err(AppError::UnprocessableEntity(_))));
        // nothing persisted, not even the valid sub-update
        let stored = state.store.load(session).await.unwrap().unwrap();
        assert_eq!(stored, good);
        assert!(state.store.filled_keys(session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_patch_disallowed_key_is_rejected() {
        let state = test_state();
        let result = handle_patch_fields(
            State(state),
            Path(Uuid::new_v4()),
            Json(patch(vec![("admin.role", json!("root"))])),
        )
        .await;
        assert!(matches!(result, Err(AppError::UnprocessableEntity(_))));
    }

    #[tokio::test]
    async fn test_patch_empty_updates_rejected() {
        let state = test_state();
        let result =
            handle_patch_fields(State(state), Path(Uuid::new_v4()), Json(patch(vec![]))).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_patch_warning_still_persisted() {
        let state = test_state();
        let session = Uuid::new_v4();
        let response = handle_patch_fields(
            State(state.clone()),
            Path(session),
            Json(patch(vec![("personal.birthDate", json!("1985"))])),
        )
        .await
        .unwrap();

        assert_eq!(response.0.issues.len(), 1);
        assert_eq!(
            response.0.document["personal"]["birthDate"],
            json!("1985-01-01")
        );
        assert!(state.store.load(session).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_cv_unknown_session_is_404() {
        let state = test_state();
        let result = handle_get_cv(State(state), Path(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_cv_returns_sorted_filled_keys() {
        let state = test_state();
        let session = Uuid::new_v4();
        handle_patch_fields(
            State(state.clone()),
            Path(session),
            Json(patch(vec![
                ("experience.totalYears", json!("3 yıl")),
                ("contact.phone", json!("0532 123 45 67")),
            ])),
        )
        .await
        .unwrap();

        let response = handle_get_cv(State(state), Path(session)).await.unwrap();
        assert_eq!(
            response.0.filled_keys,
            vec!["contact.phone", "experience.totalYears"]
        );
        assert_eq!(
            response.0.document["experience"]["totalYears"],
            json!(3)
        );
    }
}
