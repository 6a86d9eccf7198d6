use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: String,
    pub date_of_birth: NaiveDate,
    pub registered_date: NaiveDate,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Body of create and update requests
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PatientRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "Name cannot exceed 100 characters")
    )]
    pub name: String,
    #[validate(email(message = "Email should be valid"))]
    pub email: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub address: String,
    pub date_of_birth: NaiveDate,
}

impl PatientRequest {
    pub fn into_patient(self, id: Uuid, registered_date: NaiveDate) -> Patient {
        Patient {
            id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            address: self.address.trim().to_string(),
            date_of_birth: self.date_of_birth,
            registered_date,
        }
    }
}
