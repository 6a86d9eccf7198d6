//! In-memory patient registry
//!
//! Email addresses are unique across patients; uniqueness is enforced through a
//! second map so concurrent creates cannot both claim the same address.

use chrono::NaiveDate;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{PatientError, Result};
use crate::models::{Patient, PatientRequest};

#[derive(Clone, Default)]
pub struct PatientStore {
    patients: Arc<DashMap<Uuid, Patient>>,
    emails: Arc<DashMap<String, Uuid>>,
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl PatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All patients, ordered by name
    pub fn list(&self) -> Vec<Patient> {
        let mut patients: Vec<Patient> = self.patients.iter().map(|e| e.value().clone()).collect();
        patients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        patients
    }

    pub fn get(&self, id: Uuid) -> Result<Patient> {
        self.patients
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(PatientError::NotFound(id))
    }

    pub fn create(&self, request: PatientRequest, registered_date: NaiveDate) -> Result<Patient> {
        let id = Uuid::new_v4();
        self.claim_email(&request.email, id)?;

        let patient = request.into_patient(id, registered_date);
        self.patients.insert(id, patient.clone());
        Ok(patient)
    }

    pub fn update(&self, id: Uuid, request: PatientRequest) -> Result<Patient> {
        let current = self.get(id)?;
        let old_key = email_key(&current.email);
        let new_key = email_key(&request.email);

        if old_key != new_key {
            self.claim_email(&request.email, id)?;
        }

        let patient = request.into_patient(id, current.registered_date);
        match self.patients.get_mut(&id) {
            Some(mut entry) => *entry = patient.clone(),
            None => {
                // Deleted concurrently; give the new address back
                if old_key != new_key {
                    self.emails.remove(&new_key);
                }
                return Err(PatientError::NotFound(id));
            }
        }
        if old_key != new_key {
            self.emails.remove_if(&old_key, |_, owner| *owner == id);
        }
        Ok(patient)
    }

    /// Remove a patient; `NotFound` if absent
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let (_, patient) = self.patients.remove(&id).ok_or(PatientError::NotFound(id))?;
        self.emails
            .remove_if(&email_key(&patient.email), |_, owner| *owner == id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    fn claim_email(&self, email: &str, id: Uuid) -> Result<()> {
        match self.emails.entry(email_key(email)) {
            Entry::Occupied(_) => Err(PatientError::EmailExists(email.trim().to_string())),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Ok(())
            }
        }
    }
}
