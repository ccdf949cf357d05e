//! Раскрытие объявлений.
//!
//! Объявление пространства имён или импорт переписывается в пару
//! «пролог + исходное объявление». Пролог — упорядоченный список вызовов
//! `ensure_loaded`; для импорта он выполняется перед самим импортом, для
//! родительского модуля — в начале его тела.

use std::fmt;
use std::path::PathBuf;

use log::debug;

use super::path::{NamespacePath, NamespaceRef};
use super::resolver::{LayoutResolver, SourceTree};
use crate::error::{LoadError, LoadResult};

/// Вид оператора импорта.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `using` — связать экспортируемые имена
    Using,
    /// `import` — связать только сам модуль
    Import,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::Using => write!(f, "using"),
            ImportKind::Import => write!(f, "import"),
        }
    }
}

/// Одна спецификация импорта: `A.B` или `A.B: x, y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub path: NamespaceRef,
    /// Имена после двоеточия
    pub items: Option<Vec<String>>,
}

impl ImportSpec {
    /// Спецификация без двоеточия.
    pub fn plain(path: NamespaceRef) -> Self {
        Self { path, items: None }
    }

    /// Спецификация с именами после двоеточия.
    pub fn with_items(path: NamespaceRef, items: Vec<String>) -> Self {
        Self {
            path,
            items: Some(items),
        }
    }
}

/// Оператор импорта.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub kind: ImportKind,
    pub specs: Vec<ImportSpec>,
}

impl fmt::Display for ImportStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.kind)?;
        for (i, spec) in self.specs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", spec.path)?;
            if let Some(items) = &spec.items {
                write!(f, ": {}", items.join(", "))?;
            }
        }
        Ok(())
    }
}

/// Объявление пространства имён.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Полный путь объявляемого пространства
    pub path: NamespacePath,
    /// Файл, из которого пришло объявление
    pub file: Option<PathBuf>,
}

/// Объявление, поступающее в хук переписывания.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Namespace(NamespaceDecl),
    Import {
        statement: ImportStatement,
        /// Пространство, в котором стоит импорт
        caller: NamespacePath,
    },
}

/// Отложенный вызов `ensure_loaded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureCall {
    pub target: NamespaceRef,
    pub caller: NamespacePath,
}

/// Результат переписывания.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Вызовы, выполняемые до исходного объявления (или его тела)
    pub preamble: Vec<EnsureCall>,
    /// Исходное объявление без изменений
    pub declaration: Declaration,
}

impl Expansion {
    /// Объявление без пролога.
    pub fn unchanged(declaration: Declaration) -> Self {
        Self {
            preamble: Vec::new(),
            declaration,
        }
    }
}

/// Собрать все пути, на которые ссылается импорт.
///
/// Форма с двоеточием допустима только при единственной спецификации.
/// Повторы отбрасываются, порядок первого появления сохраняется.
pub fn import_targets(statement: &ImportStatement) -> LoadResult<Vec<NamespaceRef>> {
    if statement.specs.is_empty() {
        return Err(LoadError::InvalidImportForm(format!(
            "'{}' has no paths",
            statement.kind
        )));
    }

    let multiple = statement.specs.len() > 1;
    let mut targets: Vec<NamespaceRef> = Vec::new();

    for spec in &statement.specs {
        match &spec.items {
            None => push_unique(&mut targets, spec.path.clone()),
            Some(_) if multiple => {
                return Err(LoadError::InvalidImportForm(format!(
                    "'{}: ...' is not allowed with several paths in '{}'",
                    spec.path, statement
                )));
            }
            Some(items) if items.is_empty() => {
                return Err(LoadError::InvalidImportForm(format!(
                    "no names after '{}:'",
                    spec.path
                )));
            }
            Some(items) => {
                for item in items {
                    let tail: NamespacePath = item.parse().map_err(|_| {
                        LoadError::InvalidImportForm(format!(
                            "'{}' is not a name in '{}'",
                            item, statement
                        ))
                    })?;
                    push_unique(&mut targets, spec.path.join(tail.segments()));
                }
            }
        }
    }

    Ok(targets)
}

fn push_unique(targets: &mut Vec<NamespaceRef>, target: NamespaceRef) {
    if !targets.contains(&target) {
        targets.push(target);
    }
}

/// Раскрыть оператор импорта.
///
/// В пролог попадают только ссылки внутри пакета `package_root`
/// (относительные считаются внутренними).
pub fn expand_import(
    statement: ImportStatement,
    caller: &NamespacePath,
    package_root: &str,
) -> LoadResult<Expansion> {
    let preamble = import_targets(&statement)?
        .into_iter()
        .filter(|target| match target {
            NamespaceRef::Relative { .. } => true,
            NamespaceRef::Absolute(path) => {
                let internal = path.root_name() == package_root;
                if !internal {
                    debug!("{} left to the default import", path);
                }
                internal
            }
        })
        .map(|target| EnsureCall {
            target,
            caller: caller.clone(),
        })
        .collect();

    Ok(Expansion {
        preamble,
        declaration: Declaration::Import {
            statement,
            caller: caller.clone(),
        },
    })
}

/// Раскрыть объявление родительского модуля: загрузить всех детей.
pub fn expand_parent_declaration<T: SourceTree>(
    resolver: &LayoutResolver<T>,
    declaration: NamespaceDecl,
) -> LoadResult<Expansion> {
    let file = declaration
        .file
        .clone()
        .ok_or_else(|| LoadError::NotAFileContext(declaration.path.clone()))?;

    if !resolver.is_parent(&file, &declaration.path) {
        return Err(LoadError::NotAParentModule {
            path: declaration.path,
            file,
        });
    }

    let children = resolver.list_children(resolver.children_dir(&file), &file)?;
    debug!("{} has children {:?}", declaration.path, children);

    let preamble = children
        .iter()
        .map(|child| EnsureCall {
            target: NamespaceRef::Absolute(declaration.path.child(child)),
            caller: declaration.path.clone(),
        })
        .collect();

    Ok(Expansion {
        preamble,
        declaration: Declaration::Namespace(declaration),
    })
}

/// Хук переписывания объявлений для фазы обработки объявлений хоста.
///
/// Импорты раскрываются всегда. Объявление пространства имён раскрывается,
/// только если оно пришло из файла и этот файл — родитель; листья
/// возвращаются без изменений.
pub fn rewrite_declaration<T: SourceTree>(
    resolver: &LayoutResolver<T>,
    package_root: &str,
    declaration: Declaration,
) -> LoadResult<Expansion> {
    match declaration {
        Declaration::Import { statement, caller } => {
            expand_import(statement, &caller, package_root)
        }
        Declaration::Namespace(decl) => {
            let is_parent = decl
                .file
                .as_deref()
                .is_some_and(|file| resolver.is_parent(file, &decl.path));
            if is_parent {
                expand_parent_declaration(resolver, decl)
            } else {
                Ok(Expansion::unchanged(Declaration::Namespace(decl)))
            }
        }
    }
}
