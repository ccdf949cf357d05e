//! Определения ошибок для nestload.

use std::path::PathBuf;

use thiserror::Error;

use crate::modules::NamespacePath;
use crate::parser::ParseError;

/// Основной тип `Result` для библиотеки.
pub type LoadResult<T> = Result<T, LoadError>;

/// Перечисление всех возможных ошибок загрузки.
///
/// Все ошибки фатальны для текущей сессии загрузки: повторных попыток нет,
/// исправлять нужно раскладку файлов или сами импорты.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Invalid relative reference: up-count {up} exceeds caller depth {depth}")]
    InvalidRelativeReference { up: usize, depth: usize },

    #[error("Reference to foreign root: {0}")]
    ForeignRootReference(NamespacePath),

    #[error(
        "Ambiguous definition of '{segment}': both {} and {} exist",
        .leaf.display(),
        .parent.display()
    )]
    AmbiguousDefinition {
        segment: String,
        leaf: PathBuf,
        parent: PathBuf,
    },

    #[error("Definition of '{segment}' not found in {within} (tried: {})", display_paths(.tried))]
    DefinitionNotFound {
        segment: String,
        within: NamespacePath,
        tried: Vec<PathBuf>,
    },

    #[error("Declaration of {0} has no backing file")]
    NotAFileContext(NamespacePath),

    #[error("{path} declared in {} is not a parent module", .file.display())]
    NotAParentModule { path: NamespacePath, file: PathBuf },

    #[error("Invalid import form: {0}")]
    InvalidImportForm(String),

    #[error("Invalid namespace path: '{0}'")]
    InvalidPath(String),

    #[error(
        "{path} is defined in {} and also has its own file {}",
        .file.display(),
        .child.display()
    )]
    ConflictingDefinition {
        path: NamespacePath,
        file: PathBuf,
        child: PathBuf,
    },

    #[error("Namespace mismatch: expected '{expected}', file declares '{found}'")]
    NamespaceMismatch { expected: String, found: String },

    #[error("Circular include detected: {}", .0.display())]
    CircularInclude(PathBuf),

    #[error("Parse error in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
