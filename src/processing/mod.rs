//! Processing requests and the processed-file handoff.

pub mod request;
pub mod service;
pub mod sync;
pub mod tuner;

#[cfg(feature = "http")]
pub use service::HttpProcessingService;
pub use request::{ProcessingParams, ProcessingRequest, ProcessingType, RequestToken};
pub use service::{MockProcessingService, ProcessingService};
pub use sync::{FileProcessed, ProcessedBus, RequestOrigin, SwapOutcome};
pub use tuner::{Param, Tuner, TunerSnapshot};
