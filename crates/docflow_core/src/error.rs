use thiserror::Error;

use crate::{DocumentId, ResultId};

/// A user action refused before anything is sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("select at least one document first")]
    NoDocumentsSelected,
    #[error("document {document} has no specifications selected")]
    NoSpecsSelected { document: DocumentId },
    #[error("select at least one specification to refine result {result_id}")]
    NoSpecsForRefine { result_id: ResultId },
    #[error("document {0} is not part of this analysis")]
    UnknownDocument(DocumentId),
    #[error("a request is already in flight")]
    RequestInFlight,
    #[error("this step is not available right now")]
    WrongStep,
}
