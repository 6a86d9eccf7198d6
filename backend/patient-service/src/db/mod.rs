pub mod patient_repo;

pub use patient_repo::PatientStore;
