//! Test module for auth-service
//!
//! Unit tests for issuance and validation; no network or database required.
