//! # Handlers Module
//!
//! Handler registration: one typed controller per registry spec, all wired
//! to the same [`PredictionBackend`].

mod predict;

pub use predict::{ImageController, ImageInput, StructuredInput, SymptomController};

use std::sync::Arc;

use crate::backend::PredictionBackend;
use crate::dispatcher::Dispatcher;
use crate::registry::{self, SubmissionMode};

/// Register a handler for every disease in the registry.
///
/// # Safety
///
/// Spawns handler coroutines via `register_typed`; the caller must ensure
/// the May coroutine runtime is properly initialized first.
pub unsafe fn register_all(dispatcher: &mut Dispatcher, backend: &Arc<dyn PredictionBackend>) {
    for spec in registry::all() {
        let name = spec.disease.handler_name();
        match spec.mode {
            SubmissionMode::Structured => dispatcher.register_typed(
                name,
                SymptomController {
                    spec: Arc::clone(spec),
                    backend: Arc::clone(backend),
                },
            ),
            SubmissionMode::BinaryImage => dispatcher.register_typed(
                name,
                ImageController {
                    spec: Arc::clone(spec),
                    backend: Arc::clone(backend),
                },
            ),
        }
    }
}
