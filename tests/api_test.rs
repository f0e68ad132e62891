use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use grcserver::core::config::AppConfig;
use grcserver::core::middleware::issue_token;
use grcserver::core::shared::state::AppState;
use grcserver::core::shared::utils::open_memory_pool;
use grcserver::core::users::create_user;
use grcserver::main_module::build_router;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    router: Router,
    admin_token: String,
    user_token: String,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    fn with_config(mut config: AppConfig) -> Self {
        let pool = open_memory_pool().unwrap();
        let (admin, user) = {
            let mut conn = pool.get().unwrap();
            let admin =
                create_user(&mut conn, "admin@example.com", "admin", &["admin".into()]).unwrap();
            let user = create_user(&mut conn, "user@example.com", "user", &[]).unwrap();
            (admin, user)
        };

        config.auth.jwt_secret = SECRET.to_string();
        let state = Arc::new(AppState::new(pool, config));

        Self {
            router: build_router(state),
            admin_token: issue_token(admin.id, SECRET, 300).unwrap(),
            user_token: issue_token(user.id, SECRET, 300).unwrap(),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{path}"));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn admin(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = self.admin_token.clone();
        self.call(method, path, Some(&token), body).await
    }

    async fn user(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = self.user_token.clone();
        self.call(method, path, Some(&token), body).await
    }

    async fn create_framework(&self, name: &str) -> i64 {
        let (status, body) = self
            .admin(Method::POST, "/frameworks", Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn create_evidence(&self, name: &str) -> i64 {
        let (status, body) = self
            .admin(
                Method::POST,
                "/evidence",
                Some(json!({ "name": name, "description": "", "content": "" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_i64().unwrap()
    }

    fn upload_request(&self, evidence_id: i64, file_name: &str, data: &[u8]) -> Request<Body> {
        let boundary = "grc-test-boundary";
        Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/evidence/{evidence_id}/add_file"))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(multipart_body(boundary, file_name, data)))
            .unwrap()
    }

    async fn create_control(&self, body: Value) {
        let (status, resp) = self.admin(Method::POST, "/controls", Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{resp}");
        assert_eq!(resp["message"], "ok");
    }
}

fn multipart_body(boundary: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(
        format!(
            "\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"filename\"\r\n\r\n{file_name}\r\n--{boundary}--\r\n"
        )
        .as_bytes(),
    );
    body
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ok");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/v1/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_authentication_and_roles() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/frameworks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = app
        .call(Method::GET, "/frameworks", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.user(Method::GET, "/frameworks", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .user(Method::POST, "/frameworks", Some(json!({ "name": "SOC2" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("admin"));
}

#[tokio::test]
async fn test_missing_resources_return_404() {
    let app = TestApp::new();
    for path in [
        "/frameworks/99",
        "/controls/99",
        "/policies/99",
        "/projects/99",
        "/projects/99/controls",
    ] {
        let (status, body) = app.user(Method::GET, path, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert!(body["message"].is_string(), "{path}");
    }
    let (status, _) = app.admin(Method::GET, "/evidence/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/policies")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, bytes) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_control_lifecycle() {
    let app = TestApp::new();
    let framework_id = app.create_framework("ISO27001").await;

    app.create_control(json!({
        "name": "Access review",
        "description": "Quarterly review of access",
        "ref_code": "AC-1",
        "category": "Access",
        "subcategory": "Review",
        "framework_id": framework_id,
        "subcontrols": [{ "name": "Export user list" }, { "name": "Sign off" }],
        "tags": ["IAM", "quarterly"],
    }))
    .await;

    let (status, control) = app.user(Method::GET, "/controls/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(control["control_ref"], "AC-1");
    assert_eq!(control["subcontrols"].as_array().unwrap().len(), 2);
    assert_eq!(control["tags"], json!(["IAM", "quarterly"]));

    let (status, _) = app.user(Method::DELETE, "/controls/1", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.admin(Method::DELETE, "/controls/1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.user(Method::GET, "/controls/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_control_with_unknown_framework_is_rejected() {
    let app = TestApp::new();
    let (status, _) = app
        .admin(
            Method::POST,
            "/controls",
            Some(json!({ "name": "Orphan", "framework_id": 42 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_policy_lifecycle() {
    let app = TestApp::new();
    app.create_control(json!({ "name": "Backups" })).await;

    let (status, policy) = app
        .admin(
            Method::POST,
            "/policies",
            Some(json!({ "name": "Backup policy", "description": "How we back up" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let policy_id = policy["id"].as_i64().unwrap();

    let (status, _) = app
        .admin(Method::PUT, &format!("/policies/{policy_id}/controls/1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, view) = app
        .user(Method::GET, &format!("/policies/{policy_id}"), None)
        .await;
    assert_eq!(view["controls"], json!([1]));

    let (status, updated) = app
        .admin(
            Method::PUT,
            &format!("/policies/{policy_id}"),
            Some(json!({
                "name": "Backup policy v2",
                "description": "Updated",
                "template": "tpl",
                "content": "<p>body</p>",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Backup policy v2");

    let (status, _) = app
        .admin(Method::DELETE, &format!("/policies/{policy_id}/controls/1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .admin(Method::DELETE, &format!("/policies/{policy_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = app.user(Method::GET, "/policies", None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_project_creation_imports_framework_controls() {
    let app = TestApp::new();
    let framework_id = app.create_framework("SOC2").await;
    app.create_control(json!({
        "name": "Logging",
        "framework_id": framework_id,
        "subcontrols": [{ "name": "Central log store" }],
    }))
    .await;
    app.create_control(json!({ "name": "Unrelated" })).await;

    let (status, created) = app
        .admin(
            Method::POST,
            "/projects",
            Some(json!({ "name": "Audit 2024", "framework_id": framework_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["message"], "project created");
    let project_id = created["id"].as_i64().unwrap();

    let (status, project) = app
        .user(Method::GET, &format!("/projects/{project_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["name"], "Audit 2024");
    assert_eq!(project["controls"], 1);
    assert_eq!(project["policies"], 0);

    let (_, subcontrols) = app
        .user(Method::GET, &format!("/projects/{project_id}/controls"), None)
        .await;
    let subcontrols = subcontrols.as_array().unwrap();
    assert_eq!(subcontrols.len(), 1);
    assert_eq!(subcontrols[0]["name"], "Central log store");
    assert_eq!(subcontrols[0]["evidence"], json!([]));
}

#[tokio::test]
async fn test_project_creation_failures_share_one_message() {
    let app = TestApp::new();

    let (status, body) = app
        .admin(Method::POST, "/projects", Some(json!({ "name": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "failed to create project");

    let (status, body) = app
        .admin(
            Method::POST,
            "/projects",
            Some(json!({ "name": "X", "framework_id": 77 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "failed to create project");

    let (status, body) = app
        .admin(Method::POST, "/projects", Some(json!({ "description": "no name" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "failed to create project");
}

#[tokio::test]
async fn test_project_subcontrol_update_and_evidence() {
    let app = TestApp::new();
    app.create_control(json!({
        "name": "Encryption",
        "subcontrols": [{ "name": "Disk encryption" }],
    }))
    .await;
    let (_, created) = app
        .admin(Method::POST, "/projects", Some(json!({ "name": "P" })))
        .await;
    let project_id = created["id"].as_i64().unwrap();

    let (status, _) = app
        .admin(Method::PUT, &format!("/controls/1/projects/{project_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, subcontrols) = app
        .user(Method::GET, &format!("/projects/{project_id}/controls"), None)
        .await;
    let sub = &subcontrols[0];
    let project_control_id = sub["project_control_id"].as_i64().unwrap();
    let project_subcontrol_id = sub["id"].as_i64().unwrap();

    let (_, evidence) = app
        .admin(
            Method::POST,
            "/evidence",
            Some(json!({ "name": "Screenshot", "description": "", "content": "" })),
        )
        .await;
    let evidence_id = evidence["id"].as_i64().unwrap();

    let path = format!("/project-controls/{project_control_id}/subcontrols/{project_subcontrol_id}");
    let (status, _) = app
        .admin(
            Method::PUT,
            &path,
            Some(json!({
                "applicable": true,
                "implemented": 100,
                "notes": "done",
                "evidence": [evidence_id],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .admin(
            Method::PUT,
            &path,
            Some(json!({ "applicable": true, "implemented": 101 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, subcontrols) = app
        .user(Method::GET, &format!("/projects/{project_id}/controls"), None)
        .await;
    assert_eq!(subcontrols[0]["implemented"], 100);
    assert_eq!(subcontrols[0]["evidence"][0]["name"], "Screenshot");

    let (_, project) = app
        .user(Method::GET, &format!("/projects/{project_id}"), None)
        .await;
    assert_eq!(project["complete"], 1);

    let (status, _) = app
        .user(
            Method::DELETE,
            &format!("/projects/{project_id}/controls/{project_control_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .admin(
            Method::DELETE,
            &format!("/projects/{project_id}/controls/{project_control_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, project) = app
        .user(Method::GET, &format!("/projects/{project_id}"), None)
        .await;
    assert_eq!(project["controls"], 0);
}

#[tokio::test]
async fn test_query_controls() {
    let app = TestApp::new();
    app.create_control(json!({ "name": "Alpha", "category": "Network", "criteria": "c1" }))
        .await;
    app.create_control(json!({ "name": "Beta", "category": "People", "criteria": "c2" }))
        .await;

    let (status, body) = app.user(Method::GET, "/query/controls", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert!(body.get("columns").is_none());
    assert_eq!(body["data"][0]["criteria"], "c1");

    let (status, body) = app
        .user(
            Method::POST,
            "/query/controls?columns=yes",
            Some(json!({
                "filter": {
                    "condition": "AND",
                    "rules": [{ "field": "controls.category", "operator": "equal", "value": "People" }],
                    "valid": true,
                },
                "fields": ["id", "name"],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "Beta");
    assert_eq!(body["columns"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .user(
            Method::POST,
            "/query/controls",
            Some(json!({
                "filter": {
                    "condition": "AND",
                    "rules": [{ "field": "users.email", "operator": "equal", "value": "x" }],
                },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_evidence_file_upload_and_download() {
    let app = TestApp::new();
    let evidence_id = app.create_evidence("Pen test").await;

    let request = app.upload_request(evidence_id, "report.pdf", b"%PDF-1.4 test");
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let (_, files) = app
        .admin(Method::GET, &format!("/evidence/{evidence_id}/files"), None)
        .await;
    let file_id = files["files"][0].as_i64().unwrap();

    let request = Request::builder()
        .uri(format!("/api/v1/evidence/file/{file_id}"))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report.pdf\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"%PDF-1.4 test");

    let (status, _) = app
        .admin(Method::DELETE, &format!("/evidence/file/{file_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .admin(Method::GET, &format!("/evidence/file/{file_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tag_and_label_delete_not_found() {
    let app = TestApp::new();
    let (status, body) = app.admin(Method::DELETE, "/tags/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "not found" }));

    let (status, body) = app.admin(Method::DELETE, "/labels/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "not found" }));

    let (status, tag) = app
        .admin(Method::POST, "/tags", Some(json!({ "name": "Cloud" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tag["name"], "Cloud");
    let (status, body) = app
        .admin(Method::DELETE, &format!("/tags/{}", tag["id"]), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ok");
}

#[tokio::test]
async fn test_charts() {
    let app = TestApp::new();
    let framework_id = app.create_framework("PCI").await;
    app.create_control(json!({ "name": "A", "category": "Net", "framework_id": framework_id }))
        .await;
    app.create_control(json!({ "name": "B", "category": "Net" })).await;
    app.admin(Method::POST, "/projects", Some(json!({ "name": "Q1" })))
        .await;

    let (status, tenant) = app.user(Method::GET, "/charts/tenant-summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        tenant["categories"],
        json!(["Projects", "Controls", "Policies", "Subcontrols", "Users"])
    );
    assert_eq!(tenant["data"], json!([1, 2, 0, 0, 2]));

    let (_, by_framework) = app
        .user(Method::GET, "/charts/controls-by-framework", None)
        .await;
    assert_eq!(by_framework["categories"], json!(["PCI"]));
    assert_eq!(by_framework["data"], json!([1]));

    let (_, by_category) = app
        .user(Method::GET, "/charts/controls-by-category", None)
        .await;
    assert_eq!(by_category["categories"], json!(["Net"]));
    assert_eq!(by_category["data"], json!([2]));

    let (_, summaries) = app
        .user(Method::GET, "/charts/project-summaries", None)
        .await;
    assert_eq!(summaries["categories"], json!(["Q1"]));
    assert_eq!(summaries["controls"], json!([0]));
}

#[tokio::test]
async fn test_upload_larger_than_axum_default_limit() {
    let app = TestApp::new();
    let evidence_id = app.create_evidence("Firewall export").await;

    let data = vec![b'x'; 3 * 1024 * 1024];
    let (status, body) = app
        .send(app.upload_request(evidence_id, "rules.txt", &data))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));

    let (_, files) = app
        .admin(Method::GET, &format!("/evidence/{evidence_id}/files"), None)
        .await;
    let file_id = files["files"][0].as_i64().unwrap();
    let request = Request::builder()
        .uri(format!("/api/v1/evidence/file/{file_id}"))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .body(Body::empty())
        .unwrap();
    let (status, downloaded) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(downloaded.len(), data.len());
}

#[tokio::test]
async fn test_upload_over_configured_limit_is_rejected() {
    let mut config = AppConfig::default();
    config.server.max_upload_bytes = 1024;
    let app = TestApp::with_config(config);
    let evidence_id = app.create_evidence("Too big").await;

    let (status, body) = app
        .send(app.upload_request(evidence_id, "big.bin", &[0u8; 8 * 1024]))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["message"].is_string());

    let (_, files) = app
        .admin(Method::GET, &format!("/evidence/{evidence_id}/files"), None)
        .await;
    assert_eq!(files["files"], json!([]));
}

#[tokio::test]
async fn test_extractor_rejections_render_as_json() {
    let app = TestApp::new();

    let (status, body) = app.user(Method::GET, "/projects/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("abc"));

    let (status, body) = app
        .admin(Method::DELETE, "/tags/not-a-number", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let evidence_id = app.create_evidence("Wrong body").await;
    let (status, body) = app
        .admin(
            Method::POST,
            &format!("/evidence/{evidence_id}/add_file"),
            Some(json!({ "file": "inline" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}
