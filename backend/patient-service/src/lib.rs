//! Patient Service Library
//!
//! Patient registry behind the gateway. Identity comes only from the trust headers
//! the gateway injects; see `actix_middleware::header_auth` for the deployment
//! invariant that makes this safe.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;

use actix_web::web;

pub use db::PatientStore;
pub use error::{PatientError, Result};

/// Role allowed to create, update and delete patients
pub const ADMIN_ROLE: &str = "ADMIN";

/// Register all patient-service routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(handlers::json_config())
        .route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/patients")
                .route("", web::get().to(handlers::list_patients))
                .route("", web::post().to(handlers::create_patient))
                .route("/{id}", web::get().to(handlers::get_patient))
                .route("/{id}", web::put().to(handlers::update_patient))
                .route("/{id}", web::delete().to(handlers::delete_patient)),
        );
}
