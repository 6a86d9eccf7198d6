//! Core Flow Integration Tests
//!
//! Runs auth-service, patient-service and the API gateway on ephemeral ports and
//! drives them with a real HTTP client, the way a browser would.
//!
//! Test Coverage:
//! 1. Login through the gateway returns a usable token
//! 2. Gateway injects identity; patient-service enforces roles on it
//! 3. Client-supplied trust headers never reach a downstream service
//! 4. Missing, malformed or tampered tokens stop at the gateway
//!
//! Run: cargo test --test core_flow_test

use actix_middleware::{RequestLogging, TrustedHeaderAuth};
use actix_web::{dev::ServerHandle, web, App, HttpServer};
use chrono::Duration as TokenTtl;
use crypto_core::{Roles, SigningSecret, TokenCodec};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use api_gateway::{
    EdgeTrustMiddleware, RemoteTokenValidator, RouteTable, TokenValidator as GatewayValidator,
    UpstreamForwarder,
};
use auth_service::{
    db::InMemoryUserStore,
    models::StoredUser,
    security::{Argon2PasswordHasher, PasswordHasher},
    AppState, TokenIssuer, TokenValidator,
};
use patient_service::PatientStore;

const ADMIN: (&str, &str) = ("admin@pms.com", "password123");
const VIEWER: (&str, &str) = ("viewer@pms.com", "viewer-pass");

struct Service {
    url: String,
    handle: ServerHandle,
}

struct Stack {
    gateway: Service,
    auth: Service,
    patients: Service,
    client: reqwest::Client,
}

impl Stack {
    fn start() -> Self {
        let auth = start_auth_service();
        let patients = start_patient_service();
        let gateway = start_gateway(&auth.url, &patients.url);

        Self {
            gateway,
            auth,
            patients,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.gateway.url, path)
    }

    async fn login(&self, who: (&str, &str)) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": who.0, "password": who.1 }))
            .send()
            .await
            .expect("login request");
        assert_eq!(resp.status(), 200, "login for {}", who.0);

        let body: Value = resp.json().await.expect("login body");
        body["token"].as_str().expect("token").to_string()
    }

    async fn stop(self) {
        self.gateway.handle.stop(false).await;
        self.patients.handle.stop(false).await;
        self.auth.handle.stop(false).await;
    }
}

fn start_auth_service() -> Service {
    let secret = SigningSecret::from_bytes(vec![0x42; 32]).expect("secret");
    let codec = TokenCodec::new(&secret);
    let hasher = Arc::new(Argon2PasswordHasher::new().expect("hasher"));

    let store = InMemoryUserStore::new();
    for (email, password, roles) in [
        (ADMIN.0, ADMIN.1, "ADMIN,USER"),
        (VIEWER.0, VIEWER.1, "USER"),
    ] {
        store.insert(StoredUser {
            identifier: email.to_string(),
            hashed_secret: hasher.hash(password).expect("hash"),
            roles: Roles::parse_csv(roles).expect("roles"),
        });
    }

    let state = web::Data::new(AppState {
        issuer: TokenIssuer::new(Arc::new(store), hasher, codec.clone(), TokenTtl::hours(1)),
        validator: TokenValidator::new(codec),
    });

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogging::new())
            .app_data(state.clone())
            .configure(auth_service::configure)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind auth-service");

    let url = format!("http://{}", server.addrs()[0]);
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    Service { url, handle }
}

fn start_patient_service() -> Service {
    let store = web::Data::new(PatientStore::new());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TrustedHeaderAuth)
            .wrap(RequestLogging::new())
            .app_data(store.clone())
            .configure(patient_service::configure)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind patient-service");

    let url = format!("http://{}", server.addrs()[0]);
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    Service { url, handle }
}

fn start_gateway(auth_url: &str, patients_url: &str) -> Service {
    let routes = RouteTable::parse(&format!(
        "/api/auth={auth_url},/api/patients={patients_url}/patients"
    ))
    .expect("routes");
    let forwarder = web::Data::new(
        UpstreamForwarder::new(routes, Duration::from_secs(10)).expect("forwarder"),
    );
    let validator: Arc<dyn GatewayValidator> =
        Arc::new(RemoteTokenValidator::new(auth_url, Duration::from_secs(2), 2));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(EdgeTrustMiddleware::new(validator.clone()))
            .wrap(RequestLogging::new())
            .app_data(forwarder.clone())
            .route("/health", web::get().to(api_gateway::health))
            .default_service(web::to(api_gateway::proxy::forward))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind api-gateway");

    let url = format!("http://{}", server.addrs()[0]);
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    Service { url, handle }
}

fn jane() -> Value {
    json!({
        "name": "Jane Doe",
        "email": "jane@pms.com",
        "address": "1 Main St",
        "dateOfBirth": "1990-01-01"
    })
}

#[actix_web::test]
async fn test_login_and_manage_patients_through_gateway() {
    let stack = Stack::start();
    let admin = stack.login(ADMIN).await;
    let viewer = stack.login(VIEWER).await;

    let resp = stack
        .client
        .post(stack.url("/api/patients"))
        .bearer_auth(&admin)
        .json(&jane())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();

    let resp = stack
        .client
        .get(stack.url(&format!("/api/patients/{}", created["id"].as_str().unwrap())))
        .bearer_auth(&viewer)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched, created);

    let resp = stack
        .client
        .post(stack.url("/api/patients"))
        .bearer_auth(&viewer)
        .json(&jane())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    stack.stop().await;
}

#[actix_web::test]
async fn test_spoofed_trust_headers_never_reach_downstream() {
    let stack = Stack::start();
    let viewer = stack.login(VIEWER).await;

    // Claims admin via headers while holding a USER token
    let resp = stack
        .client
        .post(stack.url("/api/patients"))
        .bearer_auth(&viewer)
        .header("X-AUTH-USER-EMAIL", "admin@pms.com")
        .header("X-AUTH-USER-ROLES", "ADMIN")
        .header("X-User-Roles", "ADMIN")
        .json(&jane())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // No token at all: the gateway stops it before patient-service
    let resp = stack
        .client
        .get(stack.url("/api/patients"))
        .header("X-AUTH-USER-EMAIL", "admin@pms.com")
        .header("X-AUTH-USER-ROLES", "ADMIN")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "UNAUTHORIZED", "message": "Unauthorized"}));

    stack.stop().await;
}

#[actix_web::test]
async fn test_bad_tokens_stop_at_gateway() {
    let stack = Stack::start();
    let admin = stack.login(ADMIN).await;

    let tampered = format!("{}x", admin);
    for auth in [
        format!("Bearer {tampered}"),
        "Bearer not.a.jwt".to_string(),
        format!("Basic {admin}"),
    ] {
        let resp = stack
            .client
            .get(stack.url("/api/patients"))
            .header("Authorization", auth.as_str())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401, "authorization {auth:?}");
    }

    stack.stop().await;
}

#[actix_web::test]
async fn test_public_paths_skip_token_check() {
    let stack = Stack::start();

    let resp = stack.client.get(stack.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = stack
        .client
        .post(stack.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN.0, "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "BAD_CREDENTIALS");

    let resp = stack
        .client
        .get(stack.url("/api/auth/validate"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["valid"], false);

    stack.stop().await;
}
