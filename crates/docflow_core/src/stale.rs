use std::fmt;

use crate::ProjectId;

/// A result collection that a completed phase made stale.
///
/// The core only names collections; whoever owns the caches subscribes to
/// these tags and refetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StaleTag {
    ProjectSummaries,
    ProjectFiles(ProjectId),
    KnowledgeBaseStats(ProjectId),
    Results(ProjectId),
}

impl StaleTag {
    pub fn project(self) -> Option<ProjectId> {
        match self {
            StaleTag::ProjectSummaries => None,
            StaleTag::ProjectFiles(id)
            | StaleTag::KnowledgeBaseStats(id)
            | StaleTag::Results(id) => Some(id),
        }
    }

    /// Whether a subscriber interested in `project` should see this tag.
    /// Project-wide tags reach everyone.
    pub fn concerns(self, project: ProjectId) -> bool {
        self.project().map_or(true, |id| id == project)
    }
}

impl fmt::Display for StaleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleTag::ProjectSummaries => write!(f, "projects"),
            StaleTag::ProjectFiles(id) => write!(f, "files:{id}"),
            StaleTag::KnowledgeBaseStats(id) => write!(f, "kb-stats:{id}"),
            StaleTag::Results(id) => write!(f, "results:{id}"),
        }
    }
}
