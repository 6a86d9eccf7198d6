//! HTTP request handlers (REST API)
pub mod patients;

pub use patients::{
    create_patient, delete_patient, get_patient, health, json_config, list_patients,
    update_patient,
};
