//! Proposal generation: template in, uniquely named filled document out.

use crate::docx::{fill_package, DocxPackage, WalkStats};
use crate::placeholders::PlaceholderMap;
use crate::project::{Project, ProjectStore};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const OUTPUT_PREFIX: &str = "output_";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Project {0} not found")]
    ProjectNotFound(i64),

    #[error("Failed to load template {}: {source:#}", .path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to fill template: {0:#}")]
    Document(#[source] anyhow::Error),

    #[error("Failed to write {}: {source:#}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Project store error: {0:#}")]
    Store(#[source] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Fixed template path, e.g. `generated_docs/template.docx`.
    pub template: PathBuf,
    /// Directory that receives the generated documents.
    pub output_dir: PathBuf,
}

/// A filled document on disk, ready to be sent.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub path: PathBuf,
    /// Attachment name offered to the client.
    pub download_name: String,
    pub stats: WalkStats,
}

#[derive(Debug, Clone)]
pub struct DocumentGenerator {
    config: GeneratorConfig,
}

impl DocumentGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        DocumentGenerator { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Look up a project and generate its proposal.
    pub fn generate_for(
        &self,
        store: &dyn ProjectStore,
        project_id: i64,
    ) -> Result<GeneratedDocument, GenerationError> {
        let project = store
            .project(project_id)
            .map_err(GenerationError::Store)?
            .ok_or(GenerationError::ProjectNotFound(project_id))?;
        self.generate(&project)
    }

    pub fn generate(&self, project: &Project) -> Result<GeneratedDocument, GenerationError> {
        let (package, stats) = self.fill(project)?;
        let path = self.write_output(project, &package)?;
        log::info!(
            "Generated proposal for project {} ({} replacements) at {}",
            project.id,
            stats.modified,
            path.display()
        );
        Ok(GeneratedDocument {
            path,
            download_name: download_name(&project.name),
            stats,
        })
    }

    /// Fill the template in memory without writing anything.
    pub fn fill(&self, project: &Project) -> Result<(DocxPackage, WalkStats), GenerationError> {
        let template = &self.config.template;
        let mut package = DocxPackage::open(template).map_err(|source| {
            log::error!("Template load failed for {}: {:#}", template.display(), source);
            GenerationError::Template {
                path: template.clone(),
                source,
            }
        })?;
        let map = PlaceholderMap::for_project(project);
        let stats = fill_package(&mut package, &map).map_err(GenerationError::Document)?;
        Ok((package, stats))
    }

    /// Write under `output_<name>_<unix-timestamp>.docx`. The file is created
    /// exclusively; on a name clash the timestamp is bumped until it is free.
    fn write_output(
        &self,
        project: &Project,
        package: &DocxPackage,
    ) -> Result<PathBuf, GenerationError> {
        let dir = &self.config.output_dir;
        std::fs::create_dir_all(dir).map_err(|e| output_error(dir, e.into()))?;

        let mut timestamp = chrono::Utc::now().timestamp();
        let (path, file) = loop {
            let path = dir.join(output_file_name(&project.name, timestamp));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => timestamp += 1,
                Err(e) => return Err(output_error(&path, e.into())),
            }
        };

        if let Err(e) = package.write_to(file) {
            let _ = std::fs::remove_file(&path);
            return Err(output_error(&path, e));
        }
        Ok(path)
    }
}

fn output_error(path: &Path, source: anyhow::Error) -> GenerationError {
    GenerationError::Output {
        path: path.to_path_buf(),
        source,
    }
}

/// Keep letters, digits, `-` and `_`; everything else becomes `_`.
pub fn sanitize_file_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "project".to_string()
    } else {
        cleaned
    }
}

pub fn output_file_name(project_name: &str, timestamp: i64) -> String {
    format!(
        "{}{}_{}.docx",
        OUTPUT_PREFIX,
        sanitize_file_component(project_name),
        timestamp
    )
}

pub fn download_name(project_name: &str) -> String {
    format!("{}_proposal.docx", sanitize_file_component(project_name))
}
