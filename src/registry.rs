use crate::error::{IssueError, Result};
use crate::format::{issue_to_record, record_file_name, record_to_issue, RECORD_EXTENSION};
use crate::hash::generate_issue_id;
use crate::types::{format_date, Issue, IssueDraft};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the store directory inside a base directory
pub const ISSUES_DIR: &str = "issues";

/// In-memory view of every issue under one base directory
///
/// Built once per invocation with [`Registry::load`], mutated by the
/// operations below, and written back to `<base>/issues` after every
/// mutation. Nothing coordinates two processes working on the same store:
/// the last one to persist wins.
#[derive(Debug)]
pub struct Registry {
    base_dir: PathBuf,
    issues_dir: PathBuf,
    issues: BTreeMap<String, Issue>,
    skipped: Vec<PathBuf>,
}

impl Registry {
    /// Load every record under `<base_dir>/issues`
    ///
    /// A missing store directory yields an empty registry. Records that do
    /// not parse are skipped with a warning.
    pub fn load(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let issues_dir = base_dir.join(ISSUES_DIR);
        let mut registry = Self {
            base_dir,
            issues_dir,
            issues: BTreeMap::new(),
            skipped: Vec::new(),
        };

        if !registry.issues_dir.is_dir() {
            debug!(dir = %registry.issues_dir.display(), "no issue store yet");
            return Ok(registry);
        }

        let entries = fs::read_dir(&registry.issues_dir)
            .map_err(|e| IssueError::store(&registry.issues_dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| IssueError::store(&registry.issues_dir, e))?;
            let path = entry.path();

            let is_record = path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION);
            if !path.is_file() || !is_record {
                continue;
            }
            let issue_id = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => {
                    warn!(path = %path.display(), "skipping record with non UTF-8 name");
                    registry.skipped.push(path);
                    continue;
                }
            };

            let content = fs::read(&path).map_err(|e| IssueError::store(&path, e))?;
            match record_to_issue(&issue_id, &content, &path) {
                Ok(issue) => {
                    registry.issues.insert(issue.id.clone(), issue);
                }
                Err(e) => {
                    warn!("{}", e);
                    registry.skipped.push(path);
                }
            }
        }

        debug!(
            count = registry.issues.len(),
            skipped = registry.skipped.len(),
            "loaded issues"
        );
        Ok(registry)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn issues_dir(&self) -> &Path {
        &self.issues_dir
    }

    /// Record files that were present but could not be parsed
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues in registry order (ascending identifier)
    pub fn iter(&self) -> impl Iterator<Item = &Issue> + '_ {
        self.issues.values()
    }

    /// Issues whose display name is exactly `name`
    pub fn find_by_name(&self, name: &str) -> Vec<&Issue> {
        self.issues.values().filter(|i| i.name == name).collect()
    }

    /// Create a new open issue stamped with `at` and persist the registry
    pub fn create(&mut self, draft: IssueDraft, at: DateTime<Local>) -> Result<&Issue> {
        self.create_with(draft, at, |_| false)
    }

    /// Create, treating identifiers for which `reserved` holds as taken
    fn create_with<F>(
        &mut self,
        draft: IssueDraft,
        at: DateTime<Local>,
        reserved: F,
    ) -> Result<&Issue>
    where
        F: Fn(&str) -> bool,
    {
        let date = format_date(at);
        let nanos = at.timestamp_nanos_opt().unwrap_or_default();
        let info = draft.info.clone().unwrap_or_default();

        let issue_id = generate_issue_id(&date, &draft.name, &info, nanos, |candidate| {
            reserved(candidate)
                || self.issues.contains_key(candidate)
                || self.issues_dir.join(record_file_name(candidate)).exists()
        })?;

        let mut issue = Issue::new(issue_id.clone(), draft.name, date);
        issue.info = draft.info;
        issue.urge = draft.urge;

        self.issues.insert(issue_id.clone(), issue);
        if let Err(e) = self.persist() {
            self.issues.remove(&issue_id);
            return Err(e);
        }

        info!(id = %issue_id, "created issue");
        self.issues
            .get(&issue_id)
            .ok_or(IssueError::NotFound { id: issue_id })
    }

    /// Replace every issue named `draft.name` with a newly created one
    ///
    /// The new issue is persisted before the old records are removed, so a
    /// failed creation leaves the store as it was.
    pub fn create_replacing(&mut self, draft: IssueDraft, at: DateTime<Local>) -> Result<&Issue> {
        self.create_replacing_with(draft, at, |_| false)
    }

    fn create_replacing_with<F>(
        &mut self,
        draft: IssueDraft,
        at: DateTime<Local>,
        reserved: F,
    ) -> Result<&Issue>
    where
        F: Fn(&str) -> bool,
    {
        let replaced: Vec<String> = self
            .find_by_name(&draft.name)
            .into_iter()
            .map(|i| i.id.clone())
            .collect();

        let new_id = self.create_with(draft, at, reserved)?.id.clone();

        for id in replaced.iter().filter(|id| **id != new_id) {
            self.remove_record(id)?;
            self.issues.remove(id);
            info!(id = %id, replaced_by = %new_id, "replaced issue");
        }

        self.issues
            .get(&new_id)
            .ok_or(IssueError::NotFound { id: new_id })
    }

    /// All issues, most urgent first; equal urgencies keep registry order
    pub fn list(&self) -> Vec<&Issue> {
        let mut issues: Vec<&Issue> = self.issues.values().collect();
        issues.sort_by(|a, b| b.urge.cmp(&a.urge));
        issues
    }

    /// Exact identifier lookup
    pub fn get(&self, id: &str) -> Option<&Issue> {
        self.issues.get(id)
    }

    pub fn list_by_min_urgency(&self, threshold: u32) -> Vec<&Issue> {
        self.issues.values().filter(|i| i.urge >= threshold).collect()
    }

    pub fn list_by_exact_urgency(&self, urge: u32) -> Vec<&Issue> {
        self.issues.values().filter(|i| i.urge == urge).collect()
    }

    /// Close every listed issue that exists, returning the names closed
    ///
    /// The registry is persisted even when nothing matched.
    pub fn close<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<Vec<String>> {
        let mut closed = Vec::new();

        for id in ids {
            let id = id.as_ref();
            match self.issues.get_mut(id) {
                Some(issue) => {
                    issue.closed = true;
                    closed.push(issue.name.clone());
                    info!(id = %id, status = %issue.status(), "closed issue");
                }
                None => debug!(id = %id, "close skipped unknown id"),
            }
        }

        self.persist()?;
        Ok(closed)
    }

    /// Delete the record file whose stem is `id` and forget the issue
    ///
    /// Returns false, touching nothing, when no such file exists.
    pub fn delete_by_id(&mut self, id: &str) -> Result<bool> {
        let Some(path) = self.find_record_file(id)? else {
            debug!(id = %id, "nothing to delete");
            return Ok(false);
        };

        fs::remove_file(&path).map_err(|e| IssueError::store(&path, e))?;
        self.issues.remove(id);
        info!(id = %id, "deleted issue");
        Ok(true)
    }

    /// Delete every closed issue, returning the removed identifiers
    pub fn delete_closed(&mut self) -> Result<Vec<String>> {
        let to_delete: Vec<String> = self
            .issues
            .values()
            .filter(|i| i.closed)
            .map(|i| i.id.clone())
            .collect();

        for id in &to_delete {
            self.remove_record(id)?;
            self.issues.remove(id);
            info!(id = %id, "deleted closed issue");
        }

        Ok(to_delete)
    }

    /// Rewrite every issue's record file, recreating the store if needed
    ///
    /// Each file is replaced through a temporary file in the same directory,
    /// so a reader never sees a half-written record.
    pub fn persist(&self) -> Result<()> {
        fs::create_dir_all(&self.issues_dir).map_err(|e| IssueError::store(&self.issues_dir, e))?;

        for (id, issue) in &self.issues {
            let path = self.issues_dir.join(record_file_name(id));
            let record = issue_to_record(issue)?;

            let mut tmp = tempfile::NamedTempFile::new_in(&self.issues_dir)
                .map_err(|e| IssueError::store(&self.issues_dir, e))?;
            tmp.write_all(record.as_bytes())
                .map_err(|e| IssueError::store(tmp.path(), e))?;
            tmp.persist(&path)
                .map_err(|e| IssueError::store(&path, e.error))?;
        }

        debug!(count = self.issues.len(), dir = %self.issues_dir.display(), "persisted issues");
        Ok(())
    }

    /// First file in the store whose stem equals `id`
    fn find_record_file(&self, id: &str) -> Result<Option<PathBuf>> {
        Ok(self.record_files(id)?.into_iter().next())
    }

    /// Remove all files in the store whose stem equals `id`
    fn remove_record(&self, id: &str) -> Result<()> {
        for path in self.record_files(id)? {
            fs::remove_file(&path).map_err(|e| IssueError::store(&path, e))?;
        }
        Ok(())
    }

    fn record_files(&self, id: &str) -> Result<Vec<PathBuf>> {
        if !self.issues_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&self.issues_dir).map_err(|e| IssueError::store(&self.issues_dir, e))?;

        let mut matches = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| IssueError::store(&self.issues_dir, e))?.path();
            if path.is_file() && path.file_stem().is_some_and(|stem| stem == id) {
                matches.push(path);
            }
        }
        matches.sort();
        Ok(matches)
    }
}
