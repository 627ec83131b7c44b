//! Hierarchical spec picker over a flat file list.
//!
//! No tree is stored. Folders are virtual: a folder holds every file whose
//! `folder_path` equals it or is nested under it. Rows and roll-ups are
//! recomputed from the flat catalog plus the `expanded` and `selected` sets on
//! every query, so they can never drift from the selection.

use std::collections::BTreeSet;
use std::sync::Arc;

/// One selectable specification file. `path` is the unique key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFile {
    pub path: String,
    pub name: String,
    pub folder_path: String,
    pub size: u64,
}

impl SpecFile {
    /// Builds a record from a relative path, deriving name and folder.
    pub fn from_path(path: &str, size: u64) -> Self {
        let path = normalize(path);
        let (folder_path, name) = match path.rsplit_once('/') {
            Some((folder, name)) => (folder.to_string(), name.to_string()),
            None => (String::new(), path.clone()),
        };
        Self {
            path,
            name,
            folder_path,
            size,
        }
    }
}

/// Whether a file living in `file_folder` belongs to `folder`.
///
/// Matches on whole path segments: `specs/div0` is not inside `specs/div`.
/// The empty folder is the root and contains everything.
pub fn is_within(file_folder: &str, folder: &str) -> bool {
    folder.is_empty()
        || file_folder == folder
        || (file_folder.starts_with(folder) && file_folder.as_bytes().get(folder.len()) == Some(&b'/'))
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

fn parent_of(folder: &str) -> &str {
    folder.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn leaf_name(folder: &str) -> &str {
    folder.rsplit_once('/').map_or(folder, |(_, name)| name)
}

/// The authoritative universe of spec files and folders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecCatalog {
    files: Vec<SpecFile>,
    folders: BTreeSet<String>,
}

impl SpecCatalog {
    /// Later duplicates of a path are dropped. Every ancestor of a listed
    /// folder or file folder becomes a known folder.
    pub fn new(files: Vec<SpecFile>, folders: Vec<String>) -> Self {
        let mut seen = BTreeSet::new();
        let mut unique = Vec::with_capacity(files.len());
        for mut file in files {
            file.path = normalize(&file.path);
            file.folder_path = normalize(&file.folder_path);
            if seen.insert(file.path.clone()) {
                unique.push(file);
            }
        }
        unique.sort_by(|a, b| a.path.cmp(&b.path));

        let mut known = BTreeSet::new();
        let listed = folders.iter().map(|folder| normalize(folder));
        for folder in listed.chain(unique.iter().map(|f| f.folder_path.clone())) {
            let mut current = folder.as_str();
            while !current.is_empty() && known.insert(current.to_string()) {
                current = parent_of(current);
            }
        }

        Self {
            files: unique,
            folders: known,
        }
    }

    /// A catalog holding these files plus any of `extra` not already present.
    pub fn with_files(&self, extra: impl IntoIterator<Item = SpecFile>) -> Self {
        let mut files = self.files.clone();
        files.extend(extra);
        Self::new(files, self.folders.iter().cloned().collect())
    }

    pub fn files(&self) -> &[SpecFile] {
        &self.files
    }

    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.folders.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.file(path).is_some()
    }

    pub fn file(&self, path: &str) -> Option<&SpecFile> {
        self.files
            .binary_search_by(|file| file.path.as_str().cmp(path))
            .ok()
            .map(|index| &self.files[index])
    }

    pub fn files_under<'a>(&'a self, folder: &'a str) -> impl Iterator<Item = &'a SpecFile> {
        self.files
            .iter()
            .filter(move |file| is_within(&file.folder_path, folder))
    }

    fn child_folders<'a>(&'a self, folder: &'a str) -> impl Iterator<Item = &'a str> {
        self.folders
            .iter()
            .map(String::as_str)
            .filter(move |candidate| parent_of(candidate) == folder)
    }
}

/// Selected and total file counts below a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rollup {
    pub selected: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Unchecked,
    Mixed,
    Checked,
}

impl Rollup {
    pub fn check_state(self) -> CheckState {
        if self.selected == 0 {
            CheckState::Unchecked
        } else if self.selected == self.total {
            CheckState::Checked
        } else {
            CheckState::Mixed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeRow {
    Folder {
        path: String,
        name: String,
        depth: usize,
        expanded: bool,
        rollup: Rollup,
    },
    File {
        path: String,
        name: String,
        depth: usize,
        size: u64,
        selected: bool,
    },
}

/// A search match; the folder is metadata, not nesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub path: String,
    pub name: String,
    pub folder_path: String,
    pub size: u64,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeView {
    /// Empty query: folder rows, with children of expanded folders only.
    Nested(Vec<TreeRow>),
    /// Non-empty query: matching files only, no grouping.
    Flat(Vec<SearchHit>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTree {
    catalog: Arc<SpecCatalog>,
    expanded: BTreeSet<String>,
    selected: BTreeSet<String>,
}

impl SelectionTree {
    pub fn new(catalog: Arc<SpecCatalog>) -> Self {
        Self {
            catalog,
            expanded: BTreeSet::new(),
            selected: BTreeSet::new(),
        }
    }

    /// Starts with `paths` selected; paths outside the catalog are dropped.
    pub fn with_selection<I, S>(catalog: Arc<SpecCatalog>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected = paths
            .into_iter()
            .map(|path| normalize(path.as_ref()))
            .filter(|path| catalog.contains(path))
            .collect();
        Self {
            catalog,
            expanded: BTreeSet::new(),
            selected,
        }
    }

    pub fn catalog(&self) -> &Arc<SpecCatalog> {
        &self.catalog
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn selected_paths(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.selected.contains(&normalize(path))
    }

    /// Flips one file. Returns false and changes nothing for unknown paths.
    pub fn toggle_file(&mut self, path: &str) -> bool {
        let path = normalize(path);
        if !self.catalog.contains(&path) {
            return false;
        }
        if !self.selected.remove(&path) {
            self.selected.insert(path);
        }
        true
    }

    /// Sets every file under `folder` to `target` in one step.
    /// Returns how many memberships changed.
    pub fn toggle_folder(&mut self, folder: &str, target: bool) -> usize {
        let folder = normalize(folder);
        let mut changed = 0;
        for file in self.catalog.files_under(&folder) {
            let flipped = if target {
                self.selected.insert(file.path.clone())
            } else {
                self.selected.remove(&file.path)
            };
            changed += usize::from(flipped);
        }
        changed
    }

    pub fn select_all(&mut self) {
        self.toggle_folder("", true);
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_expanded(&self, folder: &str) -> bool {
        self.expanded.contains(folder)
    }

    pub fn set_expanded(&mut self, folder: &str, expanded: bool) {
        let folder = normalize(folder);
        if expanded {
            self.expanded.insert(folder);
        } else {
            self.expanded.remove(&folder);
        }
    }

    pub fn toggle_expanded(&mut self, folder: &str) {
        let expanded = !self.is_expanded(&normalize(folder));
        self.set_expanded(folder, expanded);
    }

    pub fn expand_all(&mut self) {
        self.expanded = self.catalog.folders().map(str::to_string).collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Swaps in a reloaded catalog, dropping selections and expansions that
    /// no longer exist.
    pub fn replace_catalog(&mut self, catalog: Arc<SpecCatalog>) {
        self.selected.retain(|path| catalog.contains(path));
        let folders: BTreeSet<&str> = catalog.folders().collect();
        self.expanded.retain(|folder| folders.contains(folder.as_str()));
        self.catalog = catalog;
    }

    /// Computed on demand from the flat sets.
    pub fn rollup(&self, folder: &str) -> Rollup {
        let folder = normalize(folder);
        self.catalog
            .files_under(&folder)
            .fold(Rollup::default(), |mut rollup, file| {
                rollup.total += 1;
                rollup.selected += usize::from(self.selected.contains(&file.path));
                rollup
            })
    }

    /// Case-insensitive match on file name and full relative path.
    /// Never touches `selected` or `expanded`.
    pub fn filter(&self, query: &str) -> TreeView {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            let mut rows = Vec::new();
            self.push_rows("", 0, &mut rows);
            return TreeView::Nested(rows);
        }

        let hits = self
            .catalog
            .files()
            .iter()
            .filter(|file| {
                file.name.to_lowercase().contains(&query)
                    || file.path.to_lowercase().contains(&query)
            })
            .map(|file| SearchHit {
                path: file.path.clone(),
                name: file.name.clone(),
                folder_path: file.folder_path.clone(),
                size: file.size,
                selected: self.selected.contains(&file.path),
            })
            .collect();
        TreeView::Flat(hits)
    }

    fn push_rows(&self, folder: &str, depth: usize, rows: &mut Vec<TreeRow>) {
        for child in self.catalog.child_folders(folder) {
            let expanded = self.expanded.contains(child);
            rows.push(TreeRow::Folder {
                path: child.to_string(),
                name: leaf_name(child).to_string(),
                depth,
                expanded,
                rollup: self.rollup(child),
            });
            if expanded {
                self.push_rows(child, depth + 1, rows);
            }
        }

        let mut files: Vec<&SpecFile> = self
            .catalog
            .files()
            .iter()
            .filter(|file| file.folder_path == folder)
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        rows.extend(files.into_iter().map(|file| TreeRow::File {
            path: file.path.clone(),
            name: file.name.clone(),
            depth,
            size: file.size,
            selected: self.selected.contains(&file.path),
        }));
    }
}
