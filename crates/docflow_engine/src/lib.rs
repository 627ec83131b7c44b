//! Docflow engine: server IO and effect execution.
mod api;
mod coordinator;
mod http;
mod invalidation;
mod models;
mod stream;
mod types;
mod wire;

pub use api::{ApiClient, ClientSettings, PhaseApi};
pub use coordinator::Coordinator;
pub use http::{run_index, HttpPhaseOpener};
pub use invalidation::InvalidationBus;
pub use models::{
    AnalysisResult, ContentType, DocumentType, FolderValidation, IndexResult,
    KnowledgeBaseStats, ProcessingResult, Project, ProjectCreate, ProjectFileSummary,
    ProjectUpdate, ProjectWithStats, ResultPatch, ResultSourceFile, ScanResult, ServerMessage,
    SpecReference, SubmittalStatus,
};
pub use stream::{EventSink, PhaseOpener, StreamGate, StreamHandle};
pub use types::{ApiError, FailureKind};
pub use wire::{decode_event, event_payload, LineDecoder, WireError};
