//! Clinical encounter domain: the upstream side of the billing handoff.

pub mod db;
pub mod types;

pub use db::ClinicalDb;
pub use types::{Encounter, EncounterStatus, EncounterTreatment, Patient};
