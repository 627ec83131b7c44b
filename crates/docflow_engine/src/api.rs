use std::time::Duration;

use docflow_core::{
    DocumentId, DocumentSelection, ProjectId, RefineRequest, ResultId, SpecCatalog,
    SuggestionSet,
};
use docflow_logging::flow_debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::models::{
    AnalysisBody, ContentType, FolderValidation, IndexResult, KnowledgeBaseStats,
    ProcessingResult, Project, ProjectCreate, ProjectFileSummary, ProjectUpdate,
    ProjectWithStats, RefineBody, ResultPatch, ServerMessage, SpecTreeResponse, SuggestBody,
    SuggestResponse,
};
use crate::types::{map_reqwest_error, ApiError, FailureKind};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Bounds plain REST calls only; streams and long jobs run unbounded.
    pub request_timeout: Duration,
    /// Fails a stream that stays silent this long. Off by default.
    pub stream_idle_timeout: Option<Duration>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            stream_idle_timeout: None,
        }
    }
}

/// The one-shot server calls the coordinator drives on behalf of the core.
#[async_trait::async_trait]
pub trait PhaseApi: Send + Sync {
    async fn index_knowledge_base(
        &self,
        project_id: ProjectId,
        force: bool,
    ) -> Result<IndexResult, ApiError>;

    async fn refine_result(&self, request: &RefineRequest) -> Result<ProcessingResult, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    settings: ClientSettings,
    base: Url,
    client: reqwest::Client,
    long_client: reqwest::Client,
}

impl ApiClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        let long_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
            long_client,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectWithStats>, ApiError> {
        self.get(self.endpoint("api/projects")?).await
    }

    pub async fn get_project(&self, project_id: ProjectId) -> Result<ProjectWithStats, ApiError> {
        self.get(self.endpoint(&format!("api/projects/{project_id}"))?)
            .await
    }

    pub async fn create_project(&self, project: &ProjectCreate) -> Result<Project, ApiError> {
        self.send(Method::POST, self.endpoint("api/projects")?, Some(project))
            .await
    }

    pub async fn update_project(
        &self,
        project_id: ProjectId,
        update: &ProjectUpdate,
    ) -> Result<Project, ApiError> {
        let url = self.endpoint(&format!("api/projects/{project_id}"))?;
        self.send(Method::PUT, url, Some(update)).await
    }

    pub async fn delete_project(&self, project_id: ProjectId) -> Result<ServerMessage, ApiError> {
        let url = self.endpoint(&format!("api/projects/{project_id}"))?;
        self.send(Method::DELETE, url, None::<&()>).await
    }

    pub async fn validate_folder(&self, path: &str) -> Result<FolderValidation, ApiError> {
        let mut url = self.endpoint("api/projects/validate-folder")?;
        url.query_pairs_mut().append_pair("path", path);
        self.send(Method::POST, url, None::<&()>).await
    }

    pub async fn list_files(
        &self,
        project_id: ProjectId,
        content_type: Option<ContentType>,
    ) -> Result<Vec<ProjectFileSummary>, ApiError> {
        let mut url = self.endpoint(&format!("api/projects/{project_id}/files"))?;
        if let Some(content_type) = content_type {
            url.query_pairs_mut()
                .append_pair("content_type", content_type.as_str());
        }
        self.get(url).await
    }

    pub async fn knowledge_base_stats(
        &self,
        project_id: ProjectId,
    ) -> Result<KnowledgeBaseStats, ApiError> {
        self.get(self.endpoint(&format!("api/projects/{project_id}/knowledge-base"))?)
            .await
    }

    pub async fn clear_knowledge_base(
        &self,
        project_id: ProjectId,
    ) -> Result<ServerMessage, ApiError> {
        let url = self.endpoint(&format!("api/projects/{project_id}/knowledge-base"))?;
        self.send(Method::DELETE, url, None::<&()>).await
    }

    pub async fn list_results(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<ProcessingResult>, ApiError> {
        self.get(self.endpoint(&format!("api/projects/{project_id}/results"))?)
            .await
    }

    pub async fn get_result(&self, result_id: ResultId) -> Result<ProcessingResult, ApiError> {
        self.get(self.endpoint(&format!("api/results/{result_id}"))?)
            .await
    }

    pub async fn patch_result(
        &self,
        result_id: ResultId,
        patch: &ResultPatch,
    ) -> Result<ProcessingResult, ApiError> {
        let url = self.endpoint(&format!("api/results/{result_id}"))?;
        self.send(Method::PATCH, url, Some(patch)).await
    }

    pub async fn delete_result(&self, result_id: ResultId) -> Result<ServerMessage, ApiError> {
        let url = self.endpoint(&format!("api/results/{result_id}"))?;
        self.send(Method::DELETE, url, None::<&()>).await
    }

    pub async fn suggest_specs(
        &self,
        project_id: ProjectId,
        documents: &[DocumentId],
    ) -> Result<SuggestionSet, ApiError> {
        let url = self.endpoint(&format!("api/projects/{project_id}/suggest-specs"))?;
        let body = SuggestBody {
            file_ids: documents,
        };
        let response: SuggestResponse = self.send(Method::POST, url, Some(&body)).await?;
        Ok(response.into())
    }

    pub async fn spec_tree(&self, project_id: ProjectId) -> Result<SpecCatalog, ApiError> {
        let response: SpecTreeResponse = self
            .get(self.endpoint(&format!("api/projects/{project_id}/spec-tree"))?)
            .await?;
        Ok(response.into())
    }

    pub(crate) fn scan_stream(
        &self,
        project_id: ProjectId,
        parse_content: bool,
    ) -> Result<RequestBuilder, ApiError> {
        let mut url = self.endpoint(&format!("api/projects/{project_id}/scan-stream"))?;
        url.query_pairs_mut()
            .append_pair("parse_content", bool_param(parse_content));
        Ok(self
            .long_client
            .get(url)
            .header(ACCEPT, "text/event-stream"))
    }

    pub(crate) fn analysis_stream(
        &self,
        project_id: ProjectId,
        selections: &[DocumentSelection],
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(&format!("api/projects/{project_id}/process-stream"))?;
        let body = encode_body(&AnalysisBody::new(selections))?;
        Ok(self
            .long_client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .header(CONTENT_TYPE, "application/json")
            .body(body))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        self.send(Method::GET, url, None::<&()>).await
    }

    async fn send<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        execute(self.client.request(method, url), body).await
    }
}

#[async_trait::async_trait]
impl PhaseApi for ApiClient {
    async fn index_knowledge_base(
        &self,
        project_id: ProjectId,
        force: bool,
    ) -> Result<IndexResult, ApiError> {
        let mut url = self.endpoint(&format!("api/projects/{project_id}/index"))?;
        url.query_pairs_mut().append_pair("force", bool_param(force));
        execute(self.long_client.post(url), None::<&()>).await
    }

    async fn refine_result(&self, request: &RefineRequest) -> Result<ProcessingResult, ApiError> {
        let url = self.endpoint(&format!("api/results/{}/refine", request.result_id))?;
        let body = RefineBody {
            spec_paths: &request.spec_paths,
            instruction: request.instruction.as_deref(),
        };
        execute(self.long_client.post(url), Some(&body)).await
    }
}

async fn execute<B, T>(request: RequestBuilder, body: Option<&B>) -> Result<T, ApiError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let request = match body {
        Some(body) => request
            .header(CONTENT_TYPE, "application/json")
            .body(encode_body(body)?),
        None => request,
    };
    let response = request.send().await.map_err(map_reqwest_error)?;
    let response = check_status(response).await?;
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

/// Turns a non-2xx response into an error carrying the server's `detail`.
pub(crate) async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| body.get("detail").map(detail_text))
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| status.to_string());
    flow_debug!("Server answered {}: {}", status, detail);
    Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), detail))
}

fn detail_text(detail: &serde_json::Value) -> String {
    match detail {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
