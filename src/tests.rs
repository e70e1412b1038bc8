//! End-to-end tests against the real router.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context as _, Result};
use figment::{providers::Format as _, Figment};
use reqwest::{
    multipart::{Form, Part},
    StatusCode,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{config::AppConfig, serve};

const SUPER_EMAIL: &str = "root@example.gov";
const SUPER_PASSWORD: &str = "correct-horse-battery";
const DESCRIPTION: &str = "Garbage has not been collected for two weeks in our street.";

/// A temporary test directory that will be cleaned up when the struct is dropped.
struct TempDir {
    /// The path to the directory.
    path: PathBuf,
}

impl TempDir {
    /// Create a new temporary directory.
    fn new() -> Result<Self> {
        let path = std::env::temp_dir().join(format!("barangay-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Get the path to the directory.
    fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// One isolated server: its own database, upload directory and port.
struct TestState {
    /// Held so the directory outlives the server.
    _temp_dir: TempDir,
    /// The address the test server is listening on.
    address: SocketAddr,
    /// The HTTP client.
    client: reqwest::Client,
    /// Seeded unit ids, in seed order.
    units: [i64; 2],
}

impl TestState {
    async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;

        let config: AppConfig = Figment::new()
            .merge(figment::providers::Toml::string(&format!(
                r#"
                db = 'sqlite://{dir}/test.db'

                [uploads]
                path = '{dir}/uploads'
                limit = 65536

                [bootstrap]
                super_admin_email = "{SUPER_EMAIL}"
                super_admin_password = "{SUPER_PASSWORD}"

                [[units]]
                name = "San Antonio"
                municipality = "Pasig"
                province = "Metro Manila"

                [[units]]
                name = "Poblacion"
                municipality = "Makati"
                province = "Metro Manila"
                "#,
                dir = temp_dir.path().display(),
            )))
            .extract()?;

        let state = serve::prepare(config).await?;
        let listener =
            tokio::net::TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
                .await?;
        let address = listener.local_addr()?;
        let app = serve::router(state);
        drop(tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await
        }));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let mut test = Self {
            _temp_dir: temp_dir,
            address,
            client,
            units: [0, 0],
        };
        test.units = [test.unit_id("San Antonio").await?, test.unit_id("Poblacion").await?];
        Ok(test)
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.address)
    }

    async fn unit_id(&self, name: &str) -> Result<i64> {
        let units: Vec<Value> = self.client.get(self.url("/api/units")).send().await?.json().await?;
        units
            .iter()
            .find(|u| u["name"] == name)
            .and_then(|u| u["id"].as_i64())
            .context("seeded unit is listed")
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<reqwest::Response> {
        let mut request = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// Register a resident and return a session token.
    async fn resident(&self, email: &str, unit: i64) -> Result<String> {
        let response = self
            .post(
                "/api/auth/signup",
                None,
                json!({
                    "email": email,
                    "password": "password123",
                    "firstName": "Juan",
                    "lastName": "Dela Cruz",
                    "contactNumber": "09171234567",
                    "address": "Purok 1, Brgy. San Antonio",
                    "barangayId": unit,
                }),
            )
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);

        let login: Value = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": "password123" }),
            )
            .await?
            .json()
            .await?;
        login["sessionToken"]
            .as_str()
            .map(str::to_owned)
            .context("login returns a token")
    }

    async fn super_admin(&self) -> Result<String> {
        let login: Value = self
            .post(
                "/api/admin/login",
                None,
                json!({ "username": SUPER_EMAIL, "password": SUPER_PASSWORD }),
            )
            .await?
            .json()
            .await?;
        assert_eq!(login["isSuperAdmin"], true);
        login["sessionToken"]
            .as_str()
            .map(str::to_owned)
            .context("login returns a token")
    }

    /// Provision a unit-admin through the super-admin and log in as them.
    async fn unit_admin(&self, super_token: &str, email: &str, unit: i64) -> Result<String> {
        let response = self
            .post(
                "/api/admin/create",
                Some(super_token),
                json!({
                    "email": email,
                    "password": "staffpass123",
                    "firstName": "Ana",
                    "lastName": "Reyes",
                    "barangayId": unit,
                }),
            )
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);

        let login: Value = self
            .post(
                "/api/admin/login",
                None,
                json!({ "username": email, "password": "staffpass123" }),
            )
            .await?
            .json()
            .await?;
        assert_eq!(login["isSuperAdmin"], false);
        login["sessionToken"]
            .as_str()
            .map(str::to_owned)
            .context("login returns a token")
    }

    fn complaint_form(description: &str) -> Form {
        Form::new()
            .text("fullName", "Juan Dela Cruz")
            .text("contactNumber", "09171234567")
            .text("category", "garbage")
            .text("description", description.to_owned())
            .text("location", "Purok 1, Brgy. San Antonio")
            .text("priority", "Medium")
    }

    async fn file(&self, form: Form) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/api/complaints"))
            .multipart(form)
            .send()
            .await?)
    }

    async fn file_in(&self, unit: i64) -> Result<String> {
        let form = Self::complaint_form(DESCRIPTION).text("barangayId", unit.to_string());
        let complaint: Value = self.file(form).await?.json().await?;
        complaint["complaintId"]
            .as_str()
            .map(str::to_owned)
            .context("complaint has an id")
    }
}

fn is_complaint_id(id: &str) -> bool {
    let mut parts = id.splitn(3, '-');
    parts.next() == Some("BC")
        && parts
            .next()
            .is_some_and(|y| y.len() == 4 && y.chars().all(|c| c.is_ascii_digit()))
        && parts.next().is_some_and(|rest| !rest.is_empty())
}

#[tokio::test]
async fn health_and_index() -> Result<()> {
    let state = TestState::new().await?;

    let health: Value = state.get("/_health", None).await?.json().await?;
    assert!(health["version"]
        .as_str()
        .is_some_and(|v| v.starts_with("barangay-connect/")));

    let index = state.get("/", None).await?;
    assert_eq!(index.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn file_and_track_complaint() -> Result<()> {
    let state = TestState::new().await?;

    let response = state.file(TestState::complaint_form(DESCRIPTION)).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await?;
    assert_eq!(created["status"], "Submitted");
    assert_eq!(created["priority"], "Medium");
    assert_eq!(created["category"], "garbage");
    let id = created["complaintId"].as_str().context("complaintId")?;
    assert!(is_complaint_id(id), "malformed complaint id {id}");

    let tracked = state.get(&format!("/api/complaints/{id}"), None).await?;
    assert_eq!(tracked.status(), StatusCode::OK);
    let tracked: Value = tracked.json().await?;
    assert_eq!(tracked["complaintId"], id);
    assert_eq!(tracked["fullName"], "Juan Dela Cruz");
    assert_eq!(tracked["description"], DESCRIPTION);
    assert_eq!(tracked["notes"], json!([]));

    let second: Value = state
        .file(TestState::complaint_form(DESCRIPTION))
        .await?
        .json()
        .await?;
    assert_ne!(second["complaintId"], created["complaintId"]);

    let missing = state.get("/api/complaints/BC-1999-000001", None).await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn validation_errors_use_envelope() -> Result<()> {
    let state = TestState::new().await?;

    let response = state
        .file(TestState::complaint_form(&"x".repeat(19)))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Validation error");
    assert_eq!(body["errors"][0]["field"], "description");

    let stats: Value = state.get("/api/stats", None).await?.json().await?;
    assert_eq!(stats["total"], 0);
    Ok(())
}

#[tokio::test]
async fn super_admin_can_provision_unit_admins() -> Result<()> {
    let state = TestState::new().await?;
    let root = state.super_admin().await?;
    let staff = state
        .unit_admin(&root, "staff@example.gov", state.units[0])
        .await?;

    let me: Value = state.get("/api/admin/me", Some(&staff)).await?.json().await?;
    assert_eq!(me["isSuperAdmin"], false);
    assert_eq!(me["user"]["barangay"]["name"], "San Antonio");
    assert!(me["user"].get("password").is_none());

    let denied = state
        .post(
            "/api/admin/create",
            Some(&staff),
            json!({
                "email": "other@example.gov",
                "password": "staffpass123",
                "firstName": "Ben",
                "lastName": "Cruz",
                "barangayId": state.units[0],
            }),
        )
        .await?;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let denied = state.get("/api/admin/users", Some(&staff)).await?;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let admins: Vec<Value> = state
        .get("/api/admin/users", Some(&root))
        .await?
        .json()
        .await?;
    assert_eq!(admins.len(), 2);
    Ok(())
}

#[tokio::test]
async fn wrong_admin_password_is_unauthorized() -> Result<()> {
    let state = TestState::new().await?;
    let response = state
        .post(
            "/api/admin/login",
            None,
            json!({ "username": SUPER_EMAIL, "password": "super123!" }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn session_kinds_do_not_cross() -> Result<()> {
    let state = TestState::new().await?;
    let resident = state.resident("juan@example.com", state.units[0]).await?;
    let admin = state.super_admin().await?;

    for path in ["/api/complaints", "/api/admin/me", "/api/admin/export", "/api/users"] {
        let response = state.get(path, Some(&resident)).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
    for path in ["/api/forum/posts", "/api/auth/me"] {
        let response = state.get(path, Some(&admin)).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
    }

    let id = state.file_in(state.units[0]).await?;
    let response = state
        .client
        .put(state.url(&format!("/api/complaints/{id}/status")))
        .bearer_auth(&resident)
        .json(&json!({ "status": "Resolved" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let resident_posts = [
        (format!("/api/complaints/{id}/notes"), json!({ "note": "Resolved by me" })),
        (
            "/api/admin/create".to_owned(),
            json!({
                "email": "sneaky@example.gov",
                "password": "staffpass123",
                "firstName": "Juan",
                "lastName": "Dela Cruz",
                "barangayId": state.units[0],
            }),
        ),
        ("/api/admin/logout".to_owned(), json!({})),
    ];
    for (path, body) in resident_posts {
        let response = state.post(&path, Some(&resident), body).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
    }

    let admin_posts = [
        (
            "/api/forum/posts",
            json!({ "title": "Announcement", "content": "Office closed on Monday." }),
        ),
        ("/api/auth/logout", json!({})),
    ];
    for (path, body) in admin_posts {
        let response = state.post(path, Some(&admin), body).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
    }

    // Neither session was consumed by the rejected calls.
    let me = state.get("/api/auth/me", Some(&resident)).await?;
    assert_eq!(me.status(), StatusCode::OK);
    let me = state.get("/api/admin/me", Some(&admin)).await?;
    assert_eq!(me.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn logout_invalidates_token() -> Result<()> {
    let state = TestState::new().await?;
    let resident = state.resident("juan@example.com", state.units[0]).await?;

    let me = state.get("/api/auth/me", Some(&resident)).await?;
    assert_eq!(me.status(), StatusCode::OK);

    let out = state.post("/api/auth/logout", Some(&resident), json!({})).await?;
    assert_eq!(out.status(), StatusCode::OK);

    let me = state.get("/api/auth/me", Some(&resident)).await?;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    let admin = state.super_admin().await?;
    state.post("/api/admin/logout", Some(&admin), json!({})).await?;
    let me = state.get("/api/admin/me", Some(&admin)).await?;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn duplicate_signup_is_rejected() -> Result<()> {
    let state = TestState::new().await?;
    state.resident("juan@example.com", state.units[0]).await?;

    let response = state
        .post(
            "/api/auth/signup",
            None,
            json!({
                "email": "juan@example.com",
                "password": "password123",
                "firstName": "Juan",
                "lastName": "Dela Cruz",
                "contactNumber": "09171234567",
                "address": "Purok 1, Brgy. San Antonio",
                "barangayId": state.units[0],
            }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Email already registered");

    let root = state.super_admin().await?;
    let residents: Vec<Value> = state.get("/api/users", Some(&root)).await?.json().await?;
    assert_eq!(residents.len(), 1);
    Ok(())
}

#[tokio::test]
async fn status_notes_and_stats() -> Result<()> {
    let state = TestState::new().await?;
    let root = state.super_admin().await?;
    let id = state.file_in(state.units[0]).await?;

    let client = &state.client;
    let response = client
        .put(state.url(&format!("/api/complaints/{id}/status")))
        .bearer_auth(&root)
        .json(&json!({ "status": "Closed" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let before: Value = state.get("/api/stats", None).await?.json().await?;
    let response = client
        .put(state.url(&format!("/api/complaints/{id}/status")))
        .bearer_auth(&root)
        .json(&json!({ "status": "Resolved" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let after: Value = state.get("/api/stats", None).await?.json().await?;
    assert_eq!(after["resolved"], before["resolved"].as_u64().unwrap_or(0) + 1);
    assert_eq!(after["pending"], before["pending"].as_u64().unwrap_or(0) - 1);

    for note in ["Forwarded to sanitation.", "Truck scheduled Monday."] {
        let response = state
            .post(
                &format!("/api/complaints/{id}/notes"),
                Some(&root),
                json!({ "note": note }),
            )
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let tracked: Value = state
        .get(&format!("/api/complaints/{id}"), None)
        .await?
        .json()
        .await?;
    assert_eq!(tracked["status"], "Resolved");
    assert_eq!(tracked["notes"][0]["note"], "Forwarded to sanitation.");
    assert_eq!(tracked["notes"][1]["note"], "Truck scheduled Monday.");

    let notes: Vec<Value> = state
        .get(&format!("/api/complaints/{id}/notes"), Some(&root))
        .await?
        .json()
        .await?;
    assert_eq!(notes.len(), 2);
    Ok(())
}

#[tokio::test]
async fn unit_admins_only_see_their_unit() -> Result<()> {
    let state = TestState::new().await?;
    let root = state.super_admin().await?;
    let [a, b] = state.units;
    let staff_b = state.unit_admin(&root, "staff-b@example.gov", b).await?;
    let id = state.file_in(a).await?;

    let listed: Vec<Value> = state
        .get("/api/complaints", Some(&staff_b))
        .await?
        .json()
        .await?;
    assert!(listed.is_empty());

    let widened = state
        .get(&format!("/api/complaints?barangayId={a}"), Some(&staff_b))
        .await?;
    assert_eq!(widened.status(), StatusCode::FORBIDDEN);

    let response = state
        .client
        .put(state.url(&format!("/api/complaints/{id}/status")))
        .bearer_auth(&staff_b)
        .json(&json!({ "status": "Resolved" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = state
        .post(
            &format!("/api/complaints/{id}/notes"),
            Some(&staff_b),
            json!({ "note": "Not ours" }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let stats: Value = state
        .get("/api/admin/stats", Some(&staff_b))
        .await?
        .json()
        .await?;
    assert_eq!(stats["total"], 0);

    let all: Vec<Value> = state.get("/api/complaints", Some(&root)).await?.json().await?;
    assert_eq!(all.len(), 1);
    let in_a: Vec<Value> = state
        .get(&format!("/api/complaints?barangayId={a}"), Some(&root))
        .await?
        .json()
        .await?;
    assert_eq!(in_a.len(), 1);

    let residents = state
        .get(&format!("/api/users/{a}"), Some(&staff_b))
        .await?;
    assert_eq!(residents.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn resident_complaints_default_to_their_unit() -> Result<()> {
    let state = TestState::new().await?;
    let [_, b] = state.units;
    let resident = state.resident("maria@example.com", b).await?;

    let created: Value = state
        .client
        .post(state.url("/api/complaints"))
        .bearer_auth(&resident)
        .multipart(TestState::complaint_form(DESCRIPTION))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(created["barangayId"], b);

    let anonymous: Value = state
        .file(TestState::complaint_form(DESCRIPTION))
        .await?
        .json()
        .await?;
    assert_eq!(anonymous["barangayId"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn forum_is_partitioned_by_unit() -> Result<()> {
    let state = TestState::new().await?;
    let [a, b] = state.units;
    let juan = state.resident("juan@example.com", a).await?;
    let maria = state.resident("maria@example.com", b).await?;

    let response = state
        .post(
            "/api/forum/posts",
            Some(&juan),
            json!({ "title": "Water outage", "content": "No water since this morning on Rizal St." }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let post: Value = response.json().await?;
    assert_eq!(post["author"]["firstName"], "Juan");
    let post_id = post["id"].as_i64().context("post id")?;

    let own: Vec<Value> = state
        .get("/api/forum/posts", Some(&juan))
        .await?
        .json()
        .await?;
    assert_eq!(own.len(), 1);

    let other: Vec<Value> = state
        .get("/api/forum/posts", Some(&maria))
        .await?
        .json()
        .await?;
    assert!(other.is_empty());

    let snoop = state
        .get(&format!("/api/forum/posts?barangayId={a}"), Some(&maria))
        .await?;
    assert_eq!(snoop.status(), StatusCode::FORBIDDEN);

    let reply = state
        .post(
            &format!("/api/forum/posts/{post_id}/replies"),
            Some(&maria),
            json!({ "content": "Same here" }),
        )
        .await?;
    assert_eq!(reply.status(), StatusCode::NOT_FOUND);

    let reply = state
        .post(
            &format!("/api/forum/posts/{post_id}/replies"),
            Some(&juan),
            json!({ "content": "Fixed now" }),
        )
        .await?;
    assert_eq!(reply.status(), StatusCode::CREATED);
    let replies: Vec<Value> = state
        .get(&format!("/api/forum/posts/{post_id}/replies"), Some(&juan))
        .await?
        .json()
        .await?;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["content"], "Fixed now");
    Ok(())
}

#[tokio::test]
async fn csv_export() -> Result<()> {
    let state = TestState::new().await?;
    let root = state.super_admin().await?;
    let form = TestState::complaint_form("Garbage, broken bottles and \"hazardous\" waste on the road.");
    state.file(form).await?;

    let response = state.get("/api/admin/export", Some(&root)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(content_type.starts_with("text/csv"));
    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(disposition.starts_with("attachment; filename=\"complaints-"));

    let body = response.text().await?;
    let mut lines = body.lines();
    assert_eq!(
        lines.next(),
        Some("ID,Name,Contact,Email,Category,Priority,Status,Location,Description,Created At")
    );
    assert!(body.contains("\"Garbage, broken bottles and \"\"hazardous\"\" waste on the road.\""));
    Ok(())
}

#[tokio::test]
async fn photo_uploads() -> Result<()> {
    let state = TestState::new().await?;

    let text_file = Part::bytes(b"not an image".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")?;
    let response = state
        .file(TestState::complaint_form(DESCRIPTION).part("photo", text_file))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let oversized = Part::bytes(vec![0_u8; 65537])
        .file_name("huge.png")
        .mime_str("image/png")?;
    let response = state
        .file(TestState::complaint_form(DESCRIPTION).part("photo", oversized))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stats: Value = state.get("/api/stats", None).await?.json().await?;
    assert_eq!(stats["total"], 0);

    let image = b"\x89PNG\r\n\x1a\nfake".to_vec();
    let photo = Part::bytes(image.clone())
        .file_name("garbage.PNG")
        .mime_str("image/png")?;
    let response = state
        .file(TestState::complaint_form(DESCRIPTION).part("photo", photo))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await?;
    let filename = created["photoFilename"].as_str().context("photoFilename")?;
    assert!(filename.ends_with(".png"));

    let served = state.get(&format!("/uploads/{filename}"), None).await?;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(
        served.headers().get("x-content-type-options").and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
    assert_eq!(served.bytes().await?.as_ref(), image.as_slice());
    Ok(())
}

#[tokio::test]
async fn photo_name_cannot_choose_served_type() -> Result<()> {
    let state = TestState::new().await?;

    let script = b"<svg xmlns='http://www.w3.org/2000/svg'><script>alert(1)</script></svg>";
    let svg = Part::bytes(script.to_vec())
        .file_name("pic.svg")
        .mime_str("image/svg+xml")?;
    let response = state
        .file(TestState::complaint_form(DESCRIPTION).part("photo", svg))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let html = Part::bytes(b"<script>alert(document.domain)</script>".to_vec())
        .file_name("pic.html")
        .mime_str("image/png")?;
    let response = state
        .file(TestState::complaint_form(DESCRIPTION).part("photo", html))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await?;
    let filename = created["photoFilename"].as_str().context("photoFilename")?;
    assert!(filename.ends_with(".png"), "stored as {filename}");

    let served = state.get(&format!("/uploads/{filename}"), None).await?;
    assert_eq!(served.status(), StatusCode::OK);
    let content_type = served
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(!content_type.starts_with("text/html"), "served as {content_type}");
    assert_eq!(content_type, "image/png");
    Ok(())
}

#[tokio::test]
async fn units_are_managed_by_super_admin() -> Result<()> {
    let state = TestState::new().await?;
    let root = state.super_admin().await?;
    let staff = state
        .unit_admin(&root, "staff@example.gov", state.units[0])
        .await?;

    let new_unit = json!({ "name": "Bagong Silang", "municipality": "Caloocan", "province": "Metro Manila" });
    let denied = state.post("/api/units", Some(&staff), new_unit.clone()).await?;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let created = state.post("/api/units", Some(&root), new_unit.clone()).await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let unit: Value = created.json().await?;
    let duplicate = state.post("/api/units", Some(&root), new_unit).await?;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    let id = unit["id"].as_i64().context("unit id")?;
    let response = state
        .post(&format!("/api/units/{id}/deactivate"), Some(&root), json!({}))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let listed: Vec<Value> = state.get("/api/barangays", None).await?.json().await?;
    assert_eq!(listed.len(), 2);
    Ok(())
}
