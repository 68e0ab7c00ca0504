//! Project storage.
//!
//! The export pipeline never reaches for global state; callers inject a
//! [`ProjectRepository`]. [`ProjectStore`] is the thread-safe in-memory
//! implementation, optionally mirrored to one JSON file per project.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::project::{Project, ProjectId};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested project does not exist.
    #[error("Project not found: {0}")]
    NotFound(ProjectId),
    /// A project with this ID is already stored.
    #[error("Project already exists: {0}")]
    AlreadyExists(ProjectId),
    /// The store has no data directory configured.
    #[error("No data directory configured")]
    NoDataDir,
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Access to project records by ID.
pub trait ProjectRepository: Send + Sync {
    /// Fetch a project.
    fn get(&self, id: ProjectId) -> Option<Project>;

    /// All projects, most recently updated first.
    fn list(&self) -> Vec<Project>;

    /// Store a new project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the ID is taken.
    fn insert(&self, project: Project) -> Result<ProjectId, StoreError>;

    /// Mutate a project in place and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the project does not exist.
    fn update(
        &self,
        id: ProjectId,
        f: &mut dyn FnMut(&mut Project),
    ) -> Result<Project, StoreError>;

    /// Remove a project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the project does not exist.
    fn delete(&self, id: ProjectId) -> Result<(), StoreError>;

    /// Check that the backing storage is usable.
    ///
    /// # Errors
    ///
    /// Returns the storage error that makes the repository unusable.
    fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Thread-safe project storage.
///
/// # Example
///
/// ```
/// use brandkit_core::store::{ProjectRepository, ProjectStore};
/// use brandkit_core::Project;
///
/// let store = ProjectStore::new();
/// let id = store
///     .insert(Project::new("Acme", "<svg viewBox=\"0 0 24 24\"/>"))
///     .unwrap();
/// assert!(store.get(id).is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProjectStore {
    projects: Arc<RwLock<HashMap<ProjectId, Project>>>,
    /// Optional data directory for filesystem persistence.
    data_dir: Option<PathBuf>,
}

impl ProjectStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store mirrored to JSON files in `data_dir`.
    ///
    /// The directory is created if needed. Existing project files are not
    /// loaded until [`ProjectStore::load_all`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            projects: Arc::new(RwLock::new(HashMap::new())),
            data_dir: Some(data_dir),
        })
    }

    /// Number of stored projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projects
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn project_path(&self, id: ProjectId) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{id}.json")))
    }

    /// Save a project to disk. No-op without a data directory.
    fn persist(&self, project: &Project) {
        let Some(path) = self.project_path(project.id) else {
            return;
        };
        let json = match serde_json::to_string_pretty(project) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!("Failed to serialize project {}: {e}", project.id);
                return;
            }
        };
        if let Err(e) = std::fs::write(&path, json) {
            tracing::warn!(
                "Failed to persist project {} to {}: {e}",
                project.id,
                path.display()
            );
        }
    }

    fn delete_file(&self, id: ProjectId) {
        let Some(path) = self.project_path(id) else {
            return;
        };
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Failed to delete project file {}: {e}", path.display());
            }
        }
    }

    /// Load every `*.json` project file from the data directory.
    ///
    /// Files that fail to parse are skipped with a warning. Returns the IDs
    /// that were loaded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoDataDir`] without a data directory, or
    /// [`StoreError::Io`] if the directory can't be read.
    pub fn load_all(&self) -> Result<Vec<ProjectId>, StoreError> {
        let data_dir = self.data_dir.as_ref().ok_or(StoreError::NoDataDir)?;
        let mut loaded = Vec::new();
        for entry in std::fs::read_dir(data_dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let contents = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Project>(&contents) {
                Ok(project) => {
                    loaded.push(project.id);
                    self.projects
                        .write()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .insert(project.id, project);
                }
                Err(e) => tracing::warn!("Skipping unreadable project {}: {e}", path.display()),
            }
        }
        tracing::info!(count = loaded.len(), "Loaded projects from disk");
        Ok(loaded)
    }
}

impl ProjectRepository for ProjectStore {
    fn get(&self, id: ProjectId) -> Option<Project> {
        let projects = self
            .projects
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        projects.get(&id).cloned()
    }

    fn list(&self) -> Vec<Project> {
        let projects = self
            .projects
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut all: Vec<Project> = projects.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }

    fn insert(&self, project: Project) -> Result<ProjectId, StoreError> {
        let id = project.id;
        {
            let mut projects = self
                .projects
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if projects.contains_key(&id) {
                return Err(StoreError::AlreadyExists(id));
            }
            projects.insert(id, project.clone());
        }
        self.persist(&project);
        Ok(id)
    }

    fn update(
        &self,
        id: ProjectId,
        f: &mut dyn FnMut(&mut Project),
    ) -> Result<Project, StoreError> {
        let updated = {
            let mut projects = self
                .projects
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let project = projects.get_mut(&id).ok_or(StoreError::NotFound(id))?;
            f(project);
            project.id = id;
            project.clone()
        };
        self.persist(&updated);
        Ok(updated)
    }

    fn delete(&self, id: ProjectId) -> Result<(), StoreError> {
        {
            let mut projects = self
                .projects
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            projects.remove(&id).ok_or(StoreError::NotFound(id))?;
        }
        self.delete_file(id);
        Ok(())
    }

    fn health_check(&self) -> Result<(), StoreError> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        if std::fs::metadata(dir)?.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a directory", dir.display()),
            )))
        }
    }
}
