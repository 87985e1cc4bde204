//! # docstamp-state — Stamping Job Lifecycle
//!
//! A stamping job is created `Running` and finalized exactly once into
//! `Success` or `Fail`:
//!
//! ```text
//! RUNNING ─succeed()──▶ SUCCESS
//!    │
//!    └────fail(list)──▶ FAIL
//! ```
//!
//! The typestate [`StampingJob<S>`] makes any other transition a compile
//! error. [`JobRecord`] is the serializable snapshot used by ledgers and
//! the HTTP layer, where the state is only known at runtime.

pub mod error;
pub mod job;
pub mod provenance;

pub use error::JobError;
pub use job::{Failed, JobOutcome, JobRecord, JobState, Running, StampingJob, Succeeded};
pub use provenance::ProvenanceLink;
