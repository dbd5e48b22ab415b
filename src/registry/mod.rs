//! # Registry Module
//!
//! The registry is the single source of truth for the gateway's routes: a
//! static catalog mapping each disease identifier to its validation schema,
//! submission mode, display metadata, and endpoint. Routing tables,
//! validation, handler registration, and the prediction client all derive
//! from it, so adding a disease is a one-line catalog change rather than a
//! new switch arm in every layer.

mod catalog;
mod types;

pub use catalog::{all, build_routes, spec};
pub use types::{
    Disease, DiseaseSpec, FieldDomain, FieldMeta, RouteMeta, SubmissionMode, ACCEPTED_IMAGE_TYPES,
    IMAGE_FIELD, MAX_IMAGE_BYTES,
};
