use actix_middleware::AuthenticatedUser;
use actix_web::{error::JsonPayloadError, web, HttpResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::db::PatientStore;
use crate::error::{PatientError, Result};
use crate::models::PatientRequest;
use crate::ADMIN_ROLE;

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req| {
        tracing::debug!(error = %err, "Rejected patient payload");
        PatientError::Validation(
            "Request body must be JSON with name, email, address and dateOfBirth".to_string(),
        )
        .into()
    })
}

fn validated(payload: web::Json<PatientRequest>) -> Result<PatientRequest> {
    let request = payload.into_inner();
    request.validate().map_err(|e| {
        let mut fields: Vec<String> = e.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        PatientError::Validation(format!("Invalid fields: {}", fields.join(", ")))
    })?;
    Ok(request)
}

pub async fn list_patients(
    _user: AuthenticatedUser,
    store: web::Data<PatientStore>,
) -> HttpResponse {
    HttpResponse::Ok().json(store.list())
}

pub async fn get_patient(
    _user: AuthenticatedUser,
    store: web::Data<PatientStore>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let patient = store.get(id.into_inner())?;
    Ok(HttpResponse::Ok().json(patient))
}

pub async fn create_patient(
    user: AuthenticatedUser,
    store: web::Data<PatientStore>,
    payload: web::Json<PatientRequest>,
) -> Result<HttpResponse> {
    user.require_role(ADMIN_ROLE)?;
    let request = validated(payload)?;

    let patient = store.create(request, Utc::now().date_naive())?;
    info!(patient_id = %patient.id, by = %user.subject(), "Patient created");
    Ok(HttpResponse::Created().json(patient))
}

pub async fn update_patient(
    user: AuthenticatedUser,
    store: web::Data<PatientStore>,
    id: web::Path<Uuid>,
    payload: web::Json<PatientRequest>,
) -> Result<HttpResponse> {
    user.require_role(ADMIN_ROLE)?;
    let request = validated(payload)?;

    let patient = store.update(id.into_inner(), request)?;
    info!(patient_id = %patient.id, by = %user.subject(), "Patient updated");
    Ok(HttpResponse::Ok().json(patient))
}

pub async fn delete_patient(
    user: AuthenticatedUser,
    store: web::Data<PatientStore>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    user.require_role(ADMIN_ROLE)?;
    let id = id.into_inner();

    store.delete(id)?;
    info!(patient_id = %id, by = %user.subject(), "Patient deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub async fn health() -> &'static str {
    "OK"
}
