//! Edge trust filter behaviour with an in-process validator

use actix_web::{http::StatusCode, test, web, App, HttpRequest, HttpResponse};
use async_trait::async_trait;
use crypto_core::{Identity, Roles};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use api_gateway::{EdgeTrustMiddleware, TokenValidator, ValidatorError, VerifiedIdentity};

/// Validator that accepts exactly one bearer value and counts calls
struct FixedValidator {
    accepted: &'static str,
    identity: Identity,
    calls: AtomicUsize,
}

impl FixedValidator {
    fn new(accepted: &'static str, subject: &str, roles: &str) -> Arc<Self> {
        Arc::new(Self {
            accepted,
            identity: Identity::new(subject, Roles::parse_csv(roles).unwrap()).unwrap(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenValidator for FixedValidator {
    async fn validate(&self, bearer: &str) -> Result<VerifiedIdentity, ValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if bearer == self.accepted {
            Ok(VerifiedIdentity::new(self.identity.clone()))
        } else {
            Err(ValidatorError::Rejected)
        }
    }
}

/// Downstream stand-in: echoes what it received and counts hits
async fn downstream(req: HttpRequest, hits: web::Data<AtomicUsize>) -> HttpResponse {
    hits.fetch_add(1, Ordering::SeqCst);

    let values = |name: &str| -> Vec<String> {
        req.headers()
            .get_all(name)
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    };
    let reserved: Vec<String> = req
        .headers()
        .keys()
        .map(|k| k.as_str().to_string())
        .filter(|k| k.starts_with("x-auth-") || k == "x-user-email" || k == "x-user-roles")
        .collect();

    HttpResponse::Ok().json(json!({
        "email": values("x-auth-user-email"),
        "roles": values("x-auth-user-roles"),
        "authorization": values("authorization"),
        "reserved": reserved,
    }))
}

macro_rules! gateway_app {
    ($validator:expr, $hits:expr) => {
        test::init_service(
            App::new()
                .wrap(EdgeTrustMiddleware::new($validator.clone()))
                .app_data($hits.clone())
                .default_service(web::to(downstream)),
        )
        .await
    };
}

#[actix_web::test]
async fn test_spoofed_roles_without_token_are_rejected() {
    let validator = FixedValidator::new("Bearer good", "doctor@pms.com", "DOCTOR");
    let hits = web::Data::new(AtomicUsize::new(0));
    let app = gateway_app!(validator, hits);

    let req = test::TestRequest::get()
        .uri("/api/patients")
        .insert_header(("X-AUTH-USER-ROLES", "ADMIN"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "status": "UNAUTHORIZED", "message": "Unauthorized" }));

    // Never forwarded, and no network call was made
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(validator.calls(), 0);
}

#[actix_web::test]
async fn test_valid_token_replaces_spoofed_identity() {
    let validator = FixedValidator::new("Bearer good", "doctor@pms.com", "USER,DOCTOR");
    let hits = web::Data::new(AtomicUsize::new(0));
    let app = gateway_app!(validator, hits);

    let req = test::TestRequest::get()
        .uri("/api/patients")
        .insert_header(("Authorization", "Bearer good"))
        .insert_header(("X-AUTH-USER-EMAIL", "attacker@evil.com"))
        .insert_header(("X-AUTH-USER-ROLES", "ADMIN"))
        .insert_header(("X-Auth-Impersonate", "admin@pms.com"))
        .insert_header(("X-User-Roles", "ADMIN"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["email"], json!(["doctor@pms.com"]));
    assert_eq!(body["roles"], json!(["DOCTOR,USER"]));
    assert_eq!(body["authorization"], json!(["Bearer good"]));
    let mut reserved: Vec<String> = serde_json::from_value(body["reserved"].clone()).unwrap();
    reserved.sort();
    assert_eq!(reserved, vec!["x-auth-user-email", "x-auth-user-roles"]);

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(validator.calls(), 1);
}

#[actix_web::test]
async fn test_rejected_token_is_not_forwarded() {
    let validator = FixedValidator::new("Bearer good", "doctor@pms.com", "DOCTOR");
    let hits = web::Data::new(AtomicUsize::new(0));
    let app = gateway_app!(validator, hits);

    let req = test::TestRequest::get()
        .uri("/api/patients")
        .insert_header(("Authorization", "Bearer forged"))
        .insert_header(("X-AUTH-USER-EMAIL", "attacker@evil.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(validator.calls(), 1);
}

#[actix_web::test]
async fn test_public_paths_skip_validation_but_are_sanitised() {
    let validator = FixedValidator::new("Bearer good", "doctor@pms.com", "DOCTOR");
    let hits = web::Data::new(AtomicUsize::new(0));
    let app = gateway_app!(validator, hits);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("X-AUTH-USER-EMAIL", "attacker@evil.com"))
        .insert_header(("X-AUTH-USER-ROLES", "ADMIN"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["reserved"], json!([]));
    assert_eq!(body["email"], json!([]));
    assert_eq!(validator.calls(), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn test_repeated_authorization_headers_rejected() {
    let validator = FixedValidator::new("Bearer good", "doctor@pms.com", "DOCTOR");
    let hits = web::Data::new(AtomicUsize::new(0));
    let app = gateway_app!(validator, hits);

    let req = test::TestRequest::get()
        .uri("/api/patients")
        .append_header(("Authorization", "Bearer good"))
        .append_header(("Authorization", "Bearer other"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(validator.calls(), 0);
}

#[actix_web::test]
async fn test_concurrent_requests_keep_identities_apart() {
    struct PerTokenValidator;

    #[async_trait]
    impl TokenValidator for PerTokenValidator {
        async fn validate(&self, bearer: &str) -> Result<VerifiedIdentity, ValidatorError> {
            let user = bearer.trim_start_matches("Bearer ");
            let identity = Identity::new(format!("{user}@pms.com"), Roles::single("USER").unwrap())
                .map_err(|e| ValidatorError::InvalidResponse(e.to_string()))?;
            Ok(VerifiedIdentity::new(identity))
        }
    }

    let validator: Arc<dyn TokenValidator> = Arc::new(PerTokenValidator);
    let hits = web::Data::new(AtomicUsize::new(0));
    let app = gateway_app!(validator, hits);

    let requests = ["alice", "bob", "carol"].map(|user| {
        test::TestRequest::get()
            .uri("/api/patients")
            .insert_header(("Authorization", format!("Bearer {user}")))
            .to_request()
    });
    let responses =
        futures::future::join_all(requests.into_iter().map(|req| test::call_service(&app, req))).await;

    for (resp, user) in responses.into_iter().zip(["alice", "bob", "carol"]) {
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["email"], json!([format!("{user}@pms.com")]));
    }
}
