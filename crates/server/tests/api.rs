//! End-to-end tests over the assembled router: token lifecycle, the auth
//! gate, CRUD round-trips, soft-delete cascade visibility, and the error and
//! pagination envelopes.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::util::ServiceExt;

use fluxis_deployment::{Config, Deployment};
use fluxis_server::routes;

struct TestApp {
    app: Router,
    _temp: TempDir,
}

async fn spawn_app() -> TestApp {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("test.sqlite");
    let config = Config {
        database_url: format!("sqlite://{}", db_path.display()),
        port: 0,
        admin_username: "admin".to_string(),
        admin_password: "hunter2".to_string(),
        token_secret: "test-secret".to_string(),
    };
    let deployment = Deployment::with_batch_interval(config, Duration::from_millis(100))
        .await
        .unwrap();

    TestApp {
        app: routes::router(deployment),
        _temp: temp,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn login(app: &Router) -> (String, String) {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({"username": "admin", "password": "hunter2"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["accessToken"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_is_public() {
    let test = spawn_app().await;
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn token_lifecycle_end_to_end() {
    let test = spawn_app().await;

    // Wrong credentials are a 401 with a problem body.
    let (status, body) = send(
        &test.app,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({"username": "admin", "password": "wrong"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
    assert!(body["detail"].is_string());

    let (access, refresh) = login(&test.app).await;

    // The access token opens protected routes.
    let (status, _) = send(&test.app, get("/projects", &access)).await;
    assert_eq!(status, StatusCode::OK);

    // No token, garbage tokens, and the refresh token are all rejected at
    // the gate.
    let bare = Request::builder()
        .method("GET")
        .uri("/projects")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&test.app, bare).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let (status, _) = send(&test.app, get("/projects", "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&test.app, get("/projects", &refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Refresh yields a new, working access token.
    let (status, body) = send(
        &test.app,
        json_request(
            "POST",
            "/auth/refresh",
            None,
            json!({"refreshToken": refresh}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_access = body["accessToken"].as_str().unwrap().to_string();
    let (status, _) = send(&test.app, get("/projects", &new_access)).await;
    assert_eq!(status, StatusCode::OK);

    // Passing the access token to refresh is a 400.
    let (status, _) = send(
        &test.app,
        json_request(
            "POST",
            "/auth/refresh",
            None,
            json!({"refreshToken": access}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn project_crud_and_cascade_visibility() {
    let test = spawn_app().await;
    let (access, _) = login(&test.app).await;

    let (status, project) = send(
        &test.app,
        json_request(
            "POST",
            "/projects",
            Some(&access),
            json!({"name": "Website", "description": "marketing"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["name"], "Website");
    assert_eq!(project["status"], "active");
    assert!(project["createdAt"].is_string());
    let project_id = project["id"].as_str().unwrap().to_string();

    // The three default columns are visible immediately after create.
    let (status, statuses) = send(
        &test.app,
        get(&format!("/statuses?projectId={project_id}"), &access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = statuses
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Todo", "In Progress", "Done"]);
    let todo_id = statuses[0]["id"].as_str().unwrap().to_string();

    let (status, task) = send(
        &test.app,
        json_request(
            "POST",
            "/tasks",
            Some(&access),
            json!({"projectId": project_id, "title": "Launch", "statusId": todo_id}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let task_id = task["id"].as_str().unwrap().to_string();

    // Partial update over HTTP touches only the named fields.
    let (status, updated) = send(
        &test.app,
        json_request(
            "PATCH",
            &format!("/projects/{project_id}"),
            Some(&access),
            json!({"status": "paused"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Website");
    assert_eq!(updated["status"], "paused");

    // Soft delete cascades to every read under the project.
    let (status, body) = send(&test.app, delete(&format!("/projects/{project_id}"), &access)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&test.app, get(&format!("/projects/{project_id}"), &access)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    let (status, statuses) = send(
        &test.app,
        get(&format!("/statuses?projectId={project_id}"), &access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(statuses.as_array().unwrap().len(), 0);

    let (status, _) = send(&test.app, get(&format!("/tasks/{task_id}"), &access)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&test.app, get(&format!("/statuses/{todo_id}"), &access)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting twice surfaces as not-found, not as an internal error.
    let (status, _) = send(&test.app, delete(&format!("/projects/{project_id}"), &access)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pagination_envelope_shape() {
    let test = spawn_app().await;
    let (access, _) = login(&test.app).await;

    for i in 0..3 {
        let (status, _) = send(
            &test.app,
            json_request(
                "POST",
                "/projects",
                Some(&access),
                json!({"name": format!("P{i}")}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &test.app,
        get("/projects?pageSize=2&sortBy=createdAt&sortOrder=asc", &access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["pageNumber"], 1);
    assert_eq!(body["pageSize"], 2);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["totalCount"], 3);

    let (status, body) = send(
        &test.app,
        get("/projects?pageSize=2&pageNumber=5&sortBy=createdAt", &access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["pageNumber"], 5);
    assert_eq!(body["totalCount"], 3);
}

#[tokio::test]
async fn malformed_input_is_a_problem_body() {
    let test = spawn_app().await;
    let (access, _) = login(&test.app).await;

    let (status, body) = send(&test.app, get("/projects/not-a-uuid", &access)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["title"], "Bad Request");
    assert!(body["detail"].as_str().unwrap().contains("UUID"));

    let (status, _) = send(
        &test.app,
        json_request(
            "POST",
            "/tasks",
            Some(&access),
            json!({"projectId": "nope", "title": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&test.app, get("/statuses", &access)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_body_is_a_problem_body() {
    let test = spawn_app().await;
    let (access, _) = login(&test.app).await;

    // An enum value out of range fails deserialization inside the body
    // extractor and still comes back as a 400 problem body.
    let (status, body) = send(
        &test.app,
        json_request(
            "POST",
            "/projects",
            Some(&access),
            json!({"name": "X", "status": "cancelled"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["title"], "Bad Request");
    assert!(body["detail"].is_string());

    // A wrong field type gets the same treatment.
    let (status, body) = send(
        &test.app,
        json_request(
            "PATCH",
            "/projects/00000000-0000-0000-0000-000000000000",
            Some(&access),
            json!({"name": 7}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    // So does JSON that does not parse at all.
    let request = Request::builder()
        .method("POST")
        .uri("/projects")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn reorder_round_trip_over_http() {
    let test = spawn_app().await;
    let (access, _) = login(&test.app).await;

    let (_, project) = send(
        &test.app,
        json_request("POST", "/projects", Some(&access), json!({"name": "Board"})),
    )
    .await;
    let project_id = project["id"].as_str().unwrap().to_string();

    let (_, statuses) = send(
        &test.app,
        get(&format!("/statuses?projectId={project_id}"), &access),
    )
    .await;
    let ids: Vec<String> = statuses
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();

    let reordered = vec![ids[2].clone(), ids[0].clone(), ids[1].clone()];
    let (status, body) = send(
        &test.app,
        json_request(
            "POST",
            "/statuses/reorder",
            Some(&access),
            json!({"projectId": project_id, "statusIds": reordered}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let returned: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(returned, reordered);

    // An incomplete id list is rejected as a 400.
    let (status, _) = send(
        &test.app,
        json_request(
            "POST",
            "/statuses/reorder",
            Some(&access),
            json!({"projectId": project_id, "statusIds": [ids[0]]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn task_logs_surface_after_a_worker_tick() {
    let test = spawn_app().await;
    let (access, _) = login(&test.app).await;

    let (_, project) = send(
        &test.app,
        json_request("POST", "/projects", Some(&access), json!({"name": "Audited"})),
    )
    .await;
    let project_id = project["id"].as_str().unwrap().to_string();

    let (_, task) = send(
        &test.app,
        json_request(
            "POST",
            "/tasks",
            Some(&access),
            json!({"projectId": project_id, "title": "Tracked"}),
        ),
    )
    .await;
    let task_id = task["id"].as_str().unwrap().to_string();

    // The worker batches on a 100 ms interval in tests; give it two windows.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let (status, body) = send(&test.app, get(&format!("/tasks/{task_id}/logs"), &access)).await;
    assert_eq!(status, StatusCode::OK);
    let entries: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|log| log["entry"].as_str().unwrap())
        .collect();
    assert!(entries.contains(&"task.created"));

    let (status, body) = send(
        &test.app,
        get(&format!("/projects/{project_id}/logs"), &access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|log| log["entry"].as_str().unwrap())
        .collect();
    assert!(entries.contains(&"project.created"));
    assert!(entries.contains(&"task.created"));
}
