//! Система ленивой загрузки пространств имён.
//!
//! Дерево пространств имён зеркалирует дерево каталогов:
//!
//! ```text
//! src/App.ns              ; корень пакета App (родитель)
//! src/Util.ns             ; лист App.Util
//! src/Sub/Sub.ns          ; родитель App.Sub
//! src/Sub/Helper.ns       ; лист App.Sub.Helper
//! ```
//!
//! Файл загружается при первой ссылке на его путь и ровно один раз.
//! Объявление родителя загружает всех своих детей до выполнения тела,
//! импорт загружает упомянутые пути до самого импорта.

mod expand;
mod loader;
mod path;
mod registry;
mod resolver;

pub use expand::{
    expand_import, expand_parent_declaration, import_targets, rewrite_declaration, Declaration,
    EnsureCall, Expansion, ImportKind, ImportSpec, ImportStatement, NamespaceDecl,
};
pub use loader::{EnsureOutcome, Load, LoadEvent, LoadSession};
pub use path::{is_identifier, NamespacePath, NamespaceRef};
pub use registry::{LoadRegistry, LoadedNode, NodeKind};
pub use resolver::{Definition, LayoutResolver, Located, OsSourceTree, SourceTree};

/// Соглашения раскладки исходников.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConvention {
    /// Расширение исходных файлов (без точки)
    pub extension: String,
    /// Имя каталога с корнем пакета
    pub root_dir_name: String,
}

impl LayoutConvention {
    /// Создать соглашение.
    pub fn new(extension: impl Into<String>, root_dir_name: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            root_dir_name: root_dir_name.into(),
        }
    }
}

impl Default for LayoutConvention {
    fn default() -> Self {
        Self {
            extension: "ns".to_string(),
            root_dir_name: "src".to_string(),
        }
    }
}
