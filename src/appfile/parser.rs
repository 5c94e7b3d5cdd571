//! Compiled appfile loading and validation.
//!
//! Reads the compiled graph document (YAML) and checks the preconditions the
//! orchestration core relies on:
//! - The root application exists
//! - Every dependency refers to an application in the document
//! - The dependency graph is acyclic
//! - Every application selects a defined infrastructure

use super::{Compiled, File, Graph};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk form of a compiled appfile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledDocument {
    /// ID of the root application
    pub root: String,

    /// Every application in the graph, root included
    pub apps: Vec<File>,
}

/// Validation finding.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a compiled appfile from disk.
pub fn parse_compiled_file(path: &Path) -> Result<Compiled> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
    parse_compiled(&content)
}

/// Parse a compiled appfile from a YAML string.
pub fn parse_compiled(yaml: &str) -> Result<Compiled> {
    let doc: CompiledDocument =
        serde_yaml_ng::from_str(yaml).map_err(|e| Error::Appfile(format!("YAML parse error: {}", e)))?;
    let graph = Graph::new(doc.apps, &doc.root)?;
    Ok(Compiled { graph })
}

/// Validate a parsed compiled appfile. Returns a list of errors (empty = valid).
pub fn validate_compiled(compiled: &Compiled) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for vertex in compiled.graph.vertices() {
        let file = &vertex.file;
        if !file.has_path_safe_id() {
            errors.push(ValidationError {
                message: format!("application id '{}' cannot be used as a directory name", file.id),
            });
        }
        if file.application.name.is_empty() {
            errors.push(ValidationError {
                message: format!("application '{}' has no name", file.id),
            });
        }
        if file.application.app_type.is_empty() {
            errors.push(ValidationError {
                message: format!("application '{}' has no type", file.id),
            });
        }
        match file.active_infrastructure() {
            Some(infra) => {
                let mut seen = std::collections::HashSet::new();
                for foundation in &infra.foundations {
                    if !seen.insert(foundation.name.as_str()) {
                        errors.push(ValidationError {
                            message: format!(
                                "application '{}' enables foundation '{}' twice",
                                file.id, foundation.name
                            ),
                        });
                    }
                }
            }
            None => errors.push(ValidationError {
                message: format!(
                    "application '{}' selects undefined infrastructure '{}'",
                    file.id, file.project.infrastructure
                ),
            }),
        }
    }

    errors
}
