//! HTTP-level tests for launching exports and reading run history.
//!
//! Automation scripts are small bash files, so these tests need a Unix
//! host.
#![cfg(unix)]

mod common;

use std::io::Write;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{
    body_bytes, body_json, get_auth, post_empty_auth, post_json_auth, test_export_config,
    user_with_token, wait_for_execution,
};
use rpa_api::config::ExportConfig;
use rpa_api::error::AppError;
use rpa_api::services::export::{ExportOrchestrator, STALE_RUN_MESSAGE};
use rpa_core::error::CoreError;
use rpa_core::process::Process;
use rpa_core::roles::{ROLE_ADMIN_ID, ROLE_AUDITOR_ID, ROLE_USER_ID};
use rpa_core::types::DbId;
use rpa_db::models::execution::CreateExecution;
use rpa_db::repositories::ExecutionRepo;
use sqlx::PgPool;
use tempfile::{NamedTempFile, TempDir};

fn script(body: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".sh")
        .tempfile()
        .expect("create script");
    write!(file, "#!/bin/bash\n{body}\n").expect("write script");
    file
}

fn config_with_purchasing(dir: &TempDir, script: &NamedTempFile) -> ExportConfig {
    let mut config = test_export_config(dir.path());
    config.purchasing_script = Some(script.path().to_string_lossy().into_owned());
    config
}

/// Insert a finished-looking run owned by `user_id` without running anything.
async fn insert_execution(pool: &PgPool, user_id: DbId) -> DbId {
    ExecutionRepo::create(
        pool,
        &CreateExecution {
            user_id,
            process: "sales".to_string(),
            period_start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            file_name: Some("ventas_2024_02.xlsx".to_string()),
            sap_system: None,
            transaction_code: Some("KE30".to_string()),
            machine: None,
        },
    )
    .await
    .expect("insert execution")
    .id
}

// ---------------------------------------------------------------------------
// Running exports
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_successful_run_produces_downloadable_file(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let script = script(r#"printf 'xlsx-bytes' > "$RPA_OUTPUT_DIR/$RPA_OUTPUT_FILE""#);
    let app = common::build_test_app_with_exports(pool.clone(), config_with_purchasing(&dir, &script));
    let (_user, token) = user_with_token(&pool, app.clone(), "op@example.com", ROLE_USER_ID).await;

    let body = serde_json::json!({ "year": 2024, "month": 1 });
    let response = post_json_auth(app.clone(), "/api/v1/processes/purchasing/run", body, &token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "PENDING");
    assert_eq!(json["file_name"], "compras_2024_01.xlsx");
    assert_eq!(json["transaction_code"], "ME80FN");
    let id = json["id"].as_i64().unwrap();

    let finished = wait_for_execution(&pool, id).await;
    assert_eq!(finished.status, "SUCCESS", "error: {:?}", finished.error_message);
    assert!(finished.duration_secs.is_some());
    assert!(dir.path().join("compras_2024_01.xlsx").exists());

    let response = get_auth(app, &format!("/api/v1/executions/{id}/file"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .contains("spreadsheetml"));
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"compras_2024_01.xlsx\""
    );
    assert_eq!(body_bytes(response).await, b"xlsx-bytes");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_script_receives_sap_formatted_period(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let script = script(
        r#"echo "$RPA_PERIOD_START-$RPA_PERIOD_END-$RPA_TRANSACTION" > "$RPA_OUTPUT_DIR/$RPA_OUTPUT_FILE""#,
    );
    let app = common::build_test_app_with_exports(pool.clone(), config_with_purchasing(&dir, &script));
    let (_user, token) = user_with_token(&pool, app.clone(), "op@example.com", ROLE_USER_ID).await;

    let body = serde_json::json!({ "period_start": "2024-03-05", "period_end": "2024-03-20" });
    let response = post_json_auth(app, "/api/v1/processes/purchasing/run", body, &token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let id = body_json(response).await["id"].as_i64().unwrap();

    let finished = wait_for_execution(&pool, id).await;
    assert_eq!(finished.status, "SUCCESS");
    let written =
        std::fs::read_to_string(dir.path().join("compras_20240305_20240320.xlsx")).unwrap();
    assert_eq!(written.trim(), "05.03.2024-20.03.2024-ME80FN");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failing_script_records_error_and_stderr(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let script = script("echo 'SAP session not found' >&2\nexit 3");
    let app = common::build_test_app_with_exports(pool.clone(), config_with_purchasing(&dir, &script));
    let (_user, token) = user_with_token(&pool, app.clone(), "op@example.com", ROLE_USER_ID).await;

    let response = post_empty_auth(app.clone(), "/api/v1/processes/purchasing/run", &token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let id = body_json(response).await["id"].as_i64().unwrap();

    let finished = wait_for_execution(&pool, id).await;
    assert_eq!(finished.status, "FAILED");
    assert_eq!(
        finished.error_message.as_deref(),
        Some("Automation script exited with code 3")
    );
    assert_eq!(finished.stack_trace.as_deref(), Some("SAP session not found"));

    // No file to download for a failed run.
    let response = get_auth(app, &format!("/api/v1/executions/{id}/file"), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_output_file_fails_after_polling(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let script = script("exit 0");
    let app = common::build_test_app_with_exports(pool.clone(), config_with_purchasing(&dir, &script));
    let (_user, token) = user_with_token(&pool, app.clone(), "op@example.com", ROLE_USER_ID).await;

    let response = post_empty_auth(app, "/api/v1/processes/purchasing/run", &token).await;
    let id = body_json(response).await["id"].as_i64().unwrap();

    let finished = wait_for_execution(&pool, id).await;
    assert_eq!(finished.status, "FAILED");
    assert!(finished
        .error_message
        .unwrap()
        .ends_with("not ready after 3 attempts"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_script_timeout_records_failure(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let script = script("sleep 5");
    let mut config = config_with_purchasing(&dir, &script);
    config.timeout = Duration::from_millis(200);
    let app = common::build_test_app_with_exports(pool.clone(), config);
    let (_user, token) = user_with_token(&pool, app.clone(), "op@example.com", ROLE_USER_ID).await;

    let response = post_empty_auth(app.clone(), "/api/v1/processes/purchasing/run", &token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let id = body_json(response).await["id"].as_i64().unwrap();

    let finished = wait_for_execution(&pool, id).await;
    assert_eq!(finished.status, "FAILED");
    let message = finished.error_message.unwrap_or_default();
    assert!(message.starts_with("Execution timed out after "), "got: {message}");
    assert!(message.ends_with(" ms"), "got: {message}");
    assert!(finished.finished_at.is_some());

    // The process is free again once the timed-out run is recorded.
    let response = post_empty_auth(app, "/api/v1/processes/purchasing/run", &token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let retry = body_json(response).await["id"].as_i64().unwrap();
    assert_eq!(wait_for_execution(&pool, retry).await.status, "FAILED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_startup_recovery_spares_runs_still_in_progress(pool: PgPool) {
    let owner = common::create_user(&pool, "night@example.com", ROLE_USER_ID).await;
    let abandoned = insert_execution(&pool, owner.id).await;
    let in_progress = insert_execution(&pool, owner.id).await;
    ExecutionRepo::mark_running(&pool, in_progress).await.unwrap();
    sqlx::query("UPDATE execution_history SET created_at = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(abandoned)
        .execute(&pool)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let orchestrator = ExportOrchestrator::new(pool.clone(), test_export_config(dir.path()));
    assert_eq!(orchestrator.recover_stale().await.unwrap(), 1);

    let row = ExecutionRepo::find_by_id(&pool, abandoned).await.unwrap().unwrap();
    assert_eq!(row.status, "FAILED");
    assert_eq!(row.error_message.as_deref(), Some(STALE_RUN_MESSAGE));
    let row = ExecutionRepo::find_by_id(&pool, in_progress).await.unwrap().unwrap();
    assert_eq!(row.status, "RUNNING");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_second_run_of_same_process_conflicts_until_cancelled(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let script = script("sleep 8");
    let app = common::build_test_app_with_exports(pool.clone(), config_with_purchasing(&dir, &script));
    let (_user, token) = user_with_token(&pool, app.clone(), "op@example.com", ROLE_USER_ID).await;

    let response = post_empty_auth(app.clone(), "/api/v1/processes/purchasing/run", &token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let id = body_json(response).await["id"].as_i64().unwrap();

    let response = post_empty_auth(app.clone(), "/api/v1/processes/purchasing/run", &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("already running"));

    let response = get_auth(app.clone(), "/api/v1/processes", &token).await;
    let processes = body_json(response).await;
    assert_eq!(processes[0]["process"], "purchasing");
    assert_eq!(processes[0]["running_execution_id"], id);

    let response = post_empty_auth(app.clone(), &format!("/api/v1/executions/{id}/cancel"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "CANCELLED");

    let finished = wait_for_execution(&pool, id).await;
    assert_eq!(finished.status, "CANCELLED");

    // Cancelling twice reports the run as finished.
    let response = post_empty_auth(app, &format!("/api/v1/executions/{id}/cancel"), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unconfigured_process_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_user, token) = user_with_token(&pool, app.clone(), "op@example.com", ROLE_USER_ID).await;

    let response = post_empty_auth(app.clone(), "/api/v1/processes/sales/run", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_empty_auth(app, "/api/v1/processes/inventory/run", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_period_is_rejected(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let script = script("exit 0");
    let app = common::build_test_app_with_exports(pool.clone(), config_with_purchasing(&dir, &script));
    let (_user, token) = user_with_token(&pool, app.clone(), "op@example.com", ROLE_USER_ID).await;

    let body = serde_json::json!({ "period_start": "2024-03-20", "period_end": "2024-03-05" });
    let response = post_json_auth(app.clone(), "/api/v1/processes/purchasing/run", body, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = serde_json::json!({ "year": 2024, "month": 13 });
    let response = post_json_auth(app, "/api/v1/processes/purchasing/run", body, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_auditor_cannot_run_exports(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let script = script("exit 0");
    let app = common::build_test_app_with_exports(pool.clone(), config_with_purchasing(&dir, &script));
    let (_aud, token) = user_with_token(&pool, app.clone(), "aud@example.com", ROLE_AUDITOR_ID).await;

    let response = post_empty_auth(app, "/api/v1/processes/purchasing/run", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// History visibility
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_users_only_see_their_own_runs(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (owner, owner_token) = user_with_token(&pool, app.clone(), "owner@example.com", ROLE_USER_ID).await;
    let (_other, other_token) = user_with_token(&pool, app.clone(), "other@example.com", ROLE_USER_ID).await;
    let (_aud, auditor_token) = user_with_token(&pool, app.clone(), "aud@example.com", ROLE_AUDITOR_ID).await;
    let id = insert_execution(&pool, owner.id).await;

    let response = get_auth(app.clone(), &format!("/api/v1/executions/{id}"), &owner_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user_email"], "owner@example.com");

    let response = get_auth(app.clone(), &format!("/api/v1/executions/{id}"), &other_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_auth(app.clone(), "/api/v1/executions", &other_token).await;
    assert_eq!(body_json(response).await["total"], 0);

    let response = get_auth(app.clone(), "/api/v1/executions", &auditor_token).await;
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["data"][0]["id"], id);

    // Auditors can read every run but cancel none.
    let response = post_empty_auth(app, &format!("/api/v1/executions/{id}/cancel"), &auditor_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_filters_history(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin@example.com", ROLE_ADMIN_ID).await;
    let first = insert_execution(&pool, admin.id).await;
    let _second = insert_execution(&pool, admin.id).await;
    ExecutionRepo::mark_running(&pool, first).await.unwrap();
    ExecutionRepo::fail(&pool, first, "SAP logon failed", None).await.unwrap();

    let response = get_auth(app.clone(), "/api/v1/executions?status=failed&process=ventas", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["data"][0]["error_message"], "SAP logon failed");

    let response = get_auth(app.clone(), "/api/v1/executions?status=exploded", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get_auth(app, "/api/v1/executions?process=purchasing", &token).await;
    assert_eq!(body_json(response).await["total"], 0);
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_execution_can_be_started_once(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let script = script(r#"printf 'ke30' > "$RPA_OUTPUT_DIR/$RPA_OUTPUT_FILE""#);
    let mut config = test_export_config(dir.path());
    config.sales_script = Some(script.path().to_string_lossy().into_owned());

    let owner = common::create_user(&pool, "night@example.com", ROLE_USER_ID).await;
    let id = insert_execution(&pool, owner.id).await;
    let orchestrator = ExportOrchestrator::new(pool.clone(), config);

    let finished = orchestrator.run(id).await.expect("run pending execution");
    assert_eq!(finished.status, "SUCCESS");
    assert_eq!(finished.file_name.as_deref(), Some("ventas_2024_02.xlsx"));
    assert!(dir.path().join("ventas_2024_02.xlsx").exists());

    let again = orchestrator.run(id).await;
    assert_matches!(again, Err(AppError::Core(CoreError::Conflict(_))));
    assert_eq!(orchestrator.active_execution(Process::Sales), None);
}
