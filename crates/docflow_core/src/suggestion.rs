use std::collections::BTreeMap;

use crate::{DocumentId, SpecFile};

/// How many of the best suggestions start out selected for each document.
pub const SEED_LIMIT: usize = 5;

/// A candidate spec file proposed for one source document.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedSpec {
    pub path: String,
    pub name: String,
    pub relevance_score: f32,
    pub matched_terms: Vec<String>,
}

impl SuggestedSpec {
    pub fn to_spec_file(&self) -> SpecFile {
        let mut file = SpecFile::from_path(&self.path, 0);
        if !self.name.is_empty() {
            file.name = self.name.clone();
        }
        file
    }
}

/// Ranked suggestions per source document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SuggestionSet {
    by_document: BTreeMap<DocumentId, Vec<SuggestedSpec>>,
}

impl SuggestionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the candidates for a document sorted by descending score,
    /// replacing whatever the document had before. Ties keep server order.
    pub fn insert(&mut self, document: DocumentId, mut specs: Vec<SuggestedSpec>) {
        specs.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        self.by_document.insert(document, specs);
    }

    pub fn for_document(&self, document: DocumentId) -> &[SuggestedSpec] {
        self.by_document
            .get(&document)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn documents(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.by_document.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_document.is_empty()
    }

    /// The default selection for a document: its top [`SEED_LIMIT`] paths.
    pub fn seed_for(&self, document: DocumentId) -> Vec<String> {
        self.for_document(document)
            .iter()
            .take(SEED_LIMIT)
            .map(|spec| spec.path.clone())
            .collect()
    }

    /// Every suggested file across documents, for merging into a catalog.
    pub fn spec_files(&self) -> Vec<SpecFile> {
        self.by_document
            .values()
            .flatten()
            .map(SuggestedSpec::to_spec_file)
            .collect()
    }
}

impl FromIterator<(DocumentId, Vec<SuggestedSpec>)> for SuggestionSet {
    fn from_iter<T: IntoIterator<Item = (DocumentId, Vec<SuggestedSpec>)>>(iter: T) -> Self {
        let mut set = SuggestionSet::new();
        for (document, specs) in iter {
            set.insert(document, specs);
        }
        set
    }
}
