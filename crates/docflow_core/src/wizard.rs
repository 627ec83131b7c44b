use std::collections::BTreeMap;
use std::sync::Arc;

use docflow_logging::{flow_debug, flow_info};

use crate::{
    DocumentId, DocumentSelection, PipelineInput, ProjectId, SelectionTree, SpecCatalog,
    SuggestionSet, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    SelectDocuments,
    LoadingSuggestions,
    /// Human approval gate: the user edits per-document spec selections.
    Review,
    Analyzing,
}

/// Select documents, fetch suggestions, approve, analyze.
///
/// Only the last step is a server phase; it is started explicitly through
/// [`AnalysisWizard::start_analysis`], never chained from the suggestion fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisWizard {
    project_id: ProjectId,
    step: WizardStep,
    documents: Vec<DocumentId>,
    catalog: Arc<SpecCatalog>,
    suggestions: SuggestionSet,
    selections: BTreeMap<DocumentId, SelectionTree>,
    last_error: Option<String>,
}

impl AnalysisWizard {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            step: WizardStep::SelectDocuments,
            documents: Vec::new(),
            catalog: Arc::new(SpecCatalog::default()),
            suggestions: SuggestionSet::new(),
            selections: BTreeMap::new(),
            last_error: None,
        }
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn documents(&self) -> &[DocumentId] {
        &self.documents
    }

    pub fn suggestions(&self) -> &SuggestionSet {
        &self.suggestions
    }

    pub fn catalog(&self) -> &Arc<SpecCatalog> {
        &self.catalog
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn toggle_document(&mut self, document: DocumentId) -> Result<(), ValidationError> {
        self.require(WizardStep::SelectDocuments)?;
        match self.documents.iter().position(|id| *id == document) {
            Some(index) => {
                self.documents.remove(index);
            }
            None => self.documents.push(document),
        }
        Ok(())
    }

    pub fn set_documents(&mut self, documents: Vec<DocumentId>) -> Result<(), ValidationError> {
        self.require(WizardStep::SelectDocuments)?;
        let mut unique = Vec::with_capacity(documents.len());
        for document in documents {
            if !unique.contains(&document) {
                unique.push(document);
            }
        }
        self.documents = unique;
        Ok(())
    }

    /// Installs the spec folder tree. Suggested files stay in the universe.
    pub fn load_catalog(&mut self, catalog: SpecCatalog) {
        let merged = Arc::new(catalog.with_files(self.suggestions.spec_files()));
        for tree in self.selections.values_mut() {
            tree.replace_catalog(Arc::clone(&merged));
        }
        self.catalog = merged;
    }

    /// Moves to the loading step and returns the documents to ask about.
    pub fn request_suggestions(&mut self) -> Result<Vec<DocumentId>, ValidationError> {
        match self.step {
            WizardStep::LoadingSuggestions => return Err(ValidationError::RequestInFlight),
            WizardStep::Analyzing => return Err(ValidationError::WrongStep),
            WizardStep::SelectDocuments | WizardStep::Review => {}
        }
        if self.documents.is_empty() {
            return Err(ValidationError::NoDocumentsSelected);
        }
        self.step = WizardStep::LoadingSuggestions;
        self.last_error = None;
        Ok(self.documents.clone())
    }

    /// Seeds every document with its top suggestions, discarding earlier edits.
    pub fn suggestions_loaded(&mut self, suggestions: SuggestionSet) {
        if self.step != WizardStep::LoadingSuggestions {
            flow_debug!("Ignoring suggestions that arrived in step {:?}", self.step);
            return;
        }
        self.catalog = Arc::new(self.catalog.with_files(suggestions.spec_files()));
        self.selections = self
            .documents
            .iter()
            .map(|document| {
                let seed = suggestions.seed_for(*document);
                (
                    *document,
                    SelectionTree::with_selection(Arc::clone(&self.catalog), seed),
                )
            })
            .collect();
        flow_info!(
            "Seeded spec selections for {} documents of project {}",
            self.selections.len(),
            self.project_id
        );
        self.suggestions = suggestions;
        self.step = WizardStep::Review;
    }

    pub fn suggestions_failed(&mut self, message: impl Into<String>) {
        if self.step == WizardStep::LoadingSuggestions {
            self.step = WizardStep::SelectDocuments;
            self.last_error = Some(message.into());
        }
    }

    pub fn selection(&self, document: DocumentId) -> Option<&SelectionTree> {
        self.selections.get(&document)
    }

    pub fn selection_mut(
        &mut self,
        document: DocumentId,
    ) -> Result<&mut SelectionTree, ValidationError> {
        self.require(WizardStep::Review)?;
        self.selections
            .get_mut(&document)
            .ok_or(ValidationError::UnknownDocument(document))
    }

    /// Review goes back to document selection; other steps stay put.
    pub fn back(&mut self) {
        if self.step == WizardStep::Review {
            self.step = WizardStep::SelectDocuments;
        }
    }

    /// Builds the analysis input from the approved selections.
    pub fn start_analysis(&mut self) -> Result<PipelineInput, ValidationError> {
        self.require(WizardStep::Review)?;
        let selections = self
            .documents
            .iter()
            .map(|document| DocumentSelection {
                document_id: *document,
                spec_paths: self
                    .selections
                    .get(document)
                    .map(SelectionTree::selected_paths)
                    .unwrap_or_default(),
            })
            .collect();
        let input = PipelineInput::Analyze { selections };
        input.validate()?;
        self.step = WizardStep::Analyzing;
        Ok(input)
    }

    /// Back to the first step after the analysis run settled. The catalog is kept.
    pub fn finish(&mut self) {
        self.step = WizardStep::SelectDocuments;
        self.documents.clear();
        self.selections.clear();
        self.suggestions = SuggestionSet::new();
    }

    fn require(&self, step: WizardStep) -> Result<(), ValidationError> {
        if self.step == step {
            Ok(())
        } else {
            Err(ValidationError::WrongStep)
        }
    }
}
