use std::{path::PathBuf, sync::Arc};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use clap::Parser;
use serde_json::{json, Value};
use server::{cli::Cli, db, routes, AppState};
use tower::ServiceExt;

/// Router over a freshly migrated database file that is removed on drop
struct TestApp {
    router: Router,
    path: PathBuf,
}

impl TestApp {
    async fn new(name: &str) -> Self {
        Self::with_args(name, &[]).await
    }

    async fn with_args(name: &str, extra: &[&str]) -> Self {
        let path = std::env::temp_dir()
            .join(format!("salus-api-{name}-{}.sqlite", std::process::id()));
        remove_db(&path);
        let connection_string = path.to_string_lossy().into_owned();

        let mut args = vec![
            "salus-server",
            "--sqlite-connection-string",
            connection_string.as_str(),
        ];
        args.extend_from_slice(extra);
        let args = Cli::parse_from(args);

        db::run_migrations(&connection_string).unwrap();
        let pool = db::create_pool(&connection_string).unwrap();
        let router = routes::router(AppState { pool, args: Arc::new(args) });

        Self { router, path }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => {
                let body = body.to_string();
                builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, body.len())
                    .body(Body::from(body))
                    .unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Creates one exercise, one March 2024 cycle and returns their ids
    async fn seed(&self) -> (i64, i64) {
        let (status, exercise) = self
            .post(
                "/api/exercises",
                json!({"name": "Squat", "duration_sec": 45, "rest_sec": 30, "description": "Deep"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, cycle) = self
            .post(
                "/api/cycles",
                json!({"name": "Knee rehab", "start_date": "2024-03-01", "end_date": "2024-03-31"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (exercise["id"].as_i64().unwrap(), cycle["id"].as_i64().unwrap())
    }
}

fn remove_db(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        remove_db(&self.path);
    }
}

#[tokio::test]
async fn test_ping() {
    let app = TestApp::new("ping").await;
    let (status, body) = app.get("/api/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_exercise_lifecycle() {
    let app = TestApp::new("exercise").await;

    let (status, body) = app.post("/api/exercises", json!({"name": "Plank"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("duration_sec"), "{message}");
    assert!(message.contains("rest_sec"), "{message}");

    let (status, created) = app
        .post("/api/exercises", json!({"name": "Plank", "duration_sec": 60, "rest_sec": 20}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Plank");
    assert_eq!(created["description"], Value::Null);
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = app
        .put(&format!("/api/exercises/{id}"), json!({"rest_sec": 25, "description": "Hold"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["rest_sec"], 25);
    assert_eq!(updated["duration_sec"], 60);
    assert_eq!(updated["description"], "Hold");

    let (status, _) = app.put(&format!("/api/exercises/{id}"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = app.get("/api/exercises").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, summary) = app.delete(&format!("/api/exercises/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["id"], id);

    let (status, _) = app.get(&format!("/api/exercises/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/api/exercises/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cycle_dates_are_checked() {
    let app = TestApp::new("cycle-dates").await;

    let (status, _) = app
        .post(
            "/api/cycles",
            json!({"name": "Backwards", "start_date": "2024-04-01", "end_date": "2024-03-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/cycles",
            json!({"name": "Bad", "start_date": "01/03/2024", "end_date": "2024-03-31"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schedule_and_completion_flow() {
    let app = TestApp::new("flow").await;
    let (exercise_id, cycle_id) = app.seed().await;

    let (status, _) = app
        .post(
            "/api/tasks",
            json!({
                "cycle_id": cycle_id + 100,
                "exercise_id": exercise_id,
                "scheduled_time": "08:00",
                "sets": 3
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, monday) = app
        .post(
            "/api/tasks",
            json!({
                "cycle_id": cycle_id,
                "exercise_id": exercise_id,
                "scheduled_time": "08:00",
                "sets": 3,
                "day_of_week": 0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(monday["exercise_name"], "Squat");
    assert_eq!(monday["scheduled_time"], "08:00:00");
    assert_eq!(monday["is_completed"], false);
    let monday_id = monday["id"].as_i64().unwrap();

    let (status, daily) = app
        .post(
            "/api/tasks",
            json!({
                "cycle_id": cycle_id,
                "exercise_id": exercise_id,
                "scheduled_time": "07:30",
                "sets": 2
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let daily_id = daily["id"].as_i64().unwrap();

    let (status, tuesday) = app.get("/api/tasks?day_of_week=1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(tuesday.as_array().unwrap().is_empty());

    let (status, monday_list) = app
        .get(&format!("/api/tasks?day_of_week=0&cycle_id={cycle_id}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = monday_list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![monday_id]);

    let (status, _) = app.get("/api/tasks?day_of_week=9").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No body at all records a bare completion
    let (status, completion) = app
        .send(Method::POST, &format!("/api/tasks/{monday_id}/complete"), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(completion["task_id"], monday_id);
    assert_eq!(completion["exercise_name"], "Squat");
    let completion_id = completion["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            &format!("/api/tasks/{daily_id}/complete"),
            json!({"actual_sets": 2, "notes": "easy", "completed_at": "2024-03-04 07:45"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.post("/api/tasks/9999/complete", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, task) = app.get(&format!("/api/tasks/{monday_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["is_completed"], true);
    assert_eq!(task["completions"].as_array().unwrap().len(), 1);

    let (status, listed) = app.get(&format!("/api/completions?task_id={daily_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["completed_at"], "2024-03-04T07:45:00");

    let (status, _) = app.delete(&format!("/api/completions/{completion_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, task) = app.get(&format!("/api/tasks/{monday_id}")).await;
    assert_eq!(task["is_completed"], false);

    let (status, cycle) = app.get(&format!("/api/cycles/{cycle_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cycle["name"], "Knee rehab");
    assert_eq!(cycle["tasks"].as_array().unwrap().len(), 2);

    // The exercise is still scheduled
    let (status, _) = app.delete(&format!("/api/exercises/{exercise_id}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, summary) = app.delete(&format!("/api/cycles/{cycle_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["training_tasks"], 2);
    assert_eq!(summary["completions"], 1);

    let (_, tasks) = app.get("/api/tasks").await;
    assert!(tasks.as_array().unwrap().is_empty());
    let (status, _) = app.delete(&format!("/api/exercises/{exercise_id}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_completion_stats() {
    let app = TestApp::new("stats").await;
    let (exercise_id, cycle_id) = app.seed().await;

    let (_, task) = app
        .post(
            "/api/tasks",
            json!({
                "cycle_id": cycle_id,
                "exercise_id": exercise_id,
                "scheduled_time": "09:00",
                "sets": 3
            }),
        )
        .await;
    let task_id = task["id"].as_i64().unwrap();

    for (completed_at, sets) in [
        ("2024-03-01 09:05:00", Some(3)),
        ("2024-03-01 18:00:00", None),
        ("2024-03-02 09:10:00", Some(2)),
    ] {
        let (status, _) = app
            .post(
                "/api/completions",
                json!({"task_id": task_id, "completed_at": completed_at, "actual_sets": sets}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, stats) = app.get("/api/completions/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_completions"], 3);
    assert_eq!(stats["total_sets"], 5);
    assert_eq!(stats["exercise_stats"], json!([{"name": "Squat", "count": 3, "total_sets": 5}]));
    assert_eq!(
        stats["date_stats"],
        json!([{"date": "2024-03-01", "count": 2}, {"date": "2024-03-02", "count": 1}])
    );

    let (status, stats) = app.get("/api/completions/stats?start_date=2024-03-02").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_completions"], 1);

    let (status, stats) = app
        .get(&format!("/api/completions/stats?cycle_id={}", cycle_id + 1))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_completions"], 0);
    assert_eq!(stats["total_sets"], 0);

    let (status, _) = app.get("/api/completions/stats?start_date=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_table_conversion() {
    let app = TestApp::new("table").await;

    let (status, body) = app
        .post("/api/table", json!({"text": "Name|Age\n---|---\nAlice|30"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["converted"], true);
    assert_eq!(body["markdown"], "| Name | Age |\n| --- | --- |\n| Alice | 30 |");

    let (status, body) = app.post("/api/table", json!({"text": "just prose"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"markdown": "just prose", "converted": false}));
}

#[tokio::test]
async fn test_table_body_limit() {
    let app = TestApp::with_args("table-limit", &["--table-body-limit-bytes", "64"]).await;
    let text = "a   b\n".repeat(40);
    let (status, _) = app.post("/api/table", json!({ "text": text })).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let app = TestApp::new("cors").await;
    let request = Request::builder()
        .uri("/api/ping")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
