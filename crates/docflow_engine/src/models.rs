//! Request and response bodies of the docflow server's REST endpoints.
use chrono::NaiveDateTime;
use docflow_core::{
    AnalysisSummary, DocumentId, DocumentSelection, IndexSummary, ProjectId, ResultId,
    ScanSummary, SpecCatalog, SpecFile, SuggestedSpec, SuggestionSet,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Rfi,
    Submittal,
    Specification,
    Drawing,
    Image,
    #[serde(other)]
    Other,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Rfi => "rfi",
            ContentType::Submittal => "submittal",
            ContentType::Specification => "specification",
            ContentType::Drawing => "drawing",
            ContentType::Image => "image",
            ContentType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Rfi,
    Submittal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmittalStatus {
    NoExceptions,
    ApprovedAsNoted,
    ReviseAndResubmit,
    Rejected,
    SeeComments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub rfi_folder_path: String,
    pub specs_folder_path: String,
    pub created_date: NaiveDateTime,
    #[serde(default)]
    pub last_scanned: Option<NaiveDateTime>,
    #[serde(default)]
    pub kb_indexed: bool,
    #[serde(default)]
    pub kb_last_indexed: Option<NaiveDateTime>,
    #[serde(default)]
    pub kb_document_count: u32,
}

/// A project plus the per-type file counts shown on the project list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectWithStats {
    #[serde(flatten)]
    pub project: Project,
    #[serde(default)]
    pub total_files: u32,
    #[serde(default)]
    pub rfi_count: u32,
    #[serde(default)]
    pub submittal_count: u32,
    #[serde(default)]
    pub spec_count: u32,
    #[serde(default)]
    pub drawing_count: u32,
    #[serde(default)]
    pub result_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreate {
    pub name: String,
    pub rfi_folder_path: String,
    pub specs_folder_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfi_folder_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specs_folder_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFileSummary {
    pub id: DocumentId,
    pub filename: String,
    pub file_type: String,
    pub file_size: u64,
    pub content_type: ContentType,
    #[serde(default)]
    pub has_content: bool,
    #[serde(default)]
    pub kb_indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderValidation {
    pub path: String,
    pub exists: bool,
    pub is_directory: bool,
    pub readable: bool,
    #[serde(default)]
    pub file_count: u32,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseStats {
    pub project_id: ProjectId,
    pub indexed: bool,
    pub document_count: u32,
    #[serde(default)]
    pub last_indexed: Option<NaiveDateTime>,
    #[serde(default)]
    pub embedding_model: Option<String>,
}

/// Final counts of a scan. The server may leave out counters that stayed zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanResult {
    pub project_id: ProjectId,
    pub files_found: u32,
    pub files_added: u32,
    pub files_updated: u32,
    pub files_removed: u32,
}

impl From<ScanResult> for ScanSummary {
    fn from(result: ScanResult) -> Self {
        ScanSummary {
            files_found: result.files_found,
            files_added: result.files_added,
            files_updated: result.files_updated,
            files_removed: result.files_removed,
            failed: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexResult {
    pub project_id: ProjectId,
    pub files_indexed: u32,
    pub chunks_created: u32,
    pub errors: Vec<String>,
}

impl From<IndexResult> for IndexSummary {
    fn from(result: IndexResult) -> Self {
        IndexSummary {
            files_indexed: result.files_indexed,
            chunks_created: result.chunks_created,
            failed: result.errors.len() as u32,
            errors: result.errors,
        }
    }
}

/// Totals carried by the analysis stream's final event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub completed: u32,
    #[serde(default, alias = "errors")]
    pub failed: u32,
    #[serde(default)]
    pub total: u32,
}

impl From<AnalysisResult> for AnalysisSummary {
    fn from(result: AnalysisResult) -> Self {
        AnalysisSummary {
            completed: result.completed,
            failed: result.failed,
            total: result.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecReference {
    #[serde(default)]
    pub source_file_id: Option<DocumentId>,
    #[serde(default)]
    pub source_filename: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub id: ResultId,
    /// Absent from the body returned by a patch.
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    pub source_file_id: DocumentId,
    pub document_type: DocumentType,
    #[serde(default)]
    pub response_text: Option<String>,
    #[serde(default)]
    pub status: Option<SubmittalStatus>,
    #[serde(default)]
    pub consultant_type: Option<String>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub processed_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub spec_references: Option<Vec<SpecReference>>,
    #[serde(default)]
    pub source_file: Option<ResultSourceFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSourceFile {
    pub id: DocumentId,
    pub filename: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
}

/// Editable fields of a result; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmittalStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerMessage {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalysisBody<'a> {
    pub selections: Vec<SelectionBody<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SelectionBody<'a> {
    pub file_id: DocumentId,
    pub spec_paths: &'a [String],
}

impl<'a> AnalysisBody<'a> {
    pub fn new(selections: &'a [DocumentSelection]) -> Self {
        Self {
            selections: selections
                .iter()
                .map(|selection| SelectionBody {
                    file_id: selection.document_id,
                    spec_paths: &selection.spec_paths,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SuggestBody<'a> {
    pub file_ids: &'a [DocumentId],
}

#[derive(Debug, Serialize)]
pub(crate) struct RefineBody<'a> {
    pub spec_paths: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SuggestResponse {
    #[serde(default)]
    pub suggestions: Vec<DocumentSuggestions>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DocumentSuggestions {
    pub file_id: DocumentId,
    #[serde(default)]
    pub specs: Vec<SuggestedSpecBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SuggestedSpecBody {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub relevance_score: f32,
    #[serde(default)]
    pub matched_terms: Vec<String>,
}

impl From<SuggestResponse> for SuggestionSet {
    fn from(response: SuggestResponse) -> Self {
        response
            .suggestions
            .into_iter()
            .map(|entry| {
                let specs = entry
                    .specs
                    .into_iter()
                    .map(|spec| {
                        let name = spec
                            .name
                            .unwrap_or_else(|| SpecFile::from_path(&spec.path, 0).name);
                        SuggestedSpec {
                            path: spec.path,
                            name,
                            relevance_score: spec.relevance_score,
                            matched_terms: spec.matched_terms,
                        }
                    })
                    .collect();
                (entry.file_id, specs)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SpecTreeResponse {
    #[serde(default)]
    pub files: Vec<SpecTreeFile>,
    #[serde(default)]
    pub folders: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SpecTreeFile {
    pub path: String,
    #[serde(default)]
    pub size: u64,
}

impl From<SpecTreeResponse> for SpecCatalog {
    fn from(response: SpecTreeResponse) -> Self {
        let files = response
            .files
            .iter()
            .map(|file| SpecFile::from_path(&file.path, file.size))
            .collect();
        SpecCatalog::new(files, response.folders)
    }
}
