//! Эталонный хост: загружает файлы языка объявлений.
//!
//! Хост реализует примитив `Load` и фазу обработки объявлений: для каждого
//! файла он открывает пространство имён, связывает его `def`, раскрывает
//! объявление (дети родителя грузятся до тела) и затем выполняет импорты,
//! каждый после своего пролога.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{LoadError, LoadResult};
use crate::modules::{
    Declaration, ImportStatement, LayoutConvention, Load, LoadSession, NamespaceDecl,
    NamespacePath, NamespaceRef,
};
use crate::parser::{self, Statement};

/// Открытое хостом пространство имён.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Файл-источник
    pub file: PathBuf,
    /// Имена из `def`
    pub definitions: Vec<String>,
    /// Выполненные импорты, в порядке выполнения
    pub imports: Vec<ImportStatement>,
}

/// Хост, исполняющий файлы `.ns`.
#[derive(Debug, Default)]
pub struct ScriptHost {
    namespaces: BTreeMap<NamespacePath, Namespace>,
    /// Порядок, в котором начиналось выполнение файлов
    executed: Vec<NamespacePath>,
}

impl ScriptHost {
    /// Создать новый хост.
    pub fn new() -> Self {
        Self::default()
    }

    /// Получить пространство по пути.
    pub fn namespace(&self, path: &NamespacePath) -> Option<&Namespace> {
        self.namespaces.get(path)
    }

    /// Все открытые пространства.
    pub fn namespaces(&self) -> &BTreeMap<NamespacePath, Namespace> {
        &self.namespaces
    }

    /// Порядок выполнения файлов.
    pub fn executed(&self) -> &[NamespacePath] {
        &self.executed
    }

    fn record_import(&mut self, path: &NamespacePath, statement: ImportStatement) {
        if let Some(namespace) = self.namespaces.get_mut(path) {
            namespace.imports.push(statement);
        }
    }
}

impl Load for ScriptHost {
    fn load(
        &mut self,
        session: &mut LoadSession,
        file: &Path,
        target: Option<&NamespacePath>,
    ) -> LoadResult<()> {
        let source = fs::read_to_string(file)?;
        let unit = parser::parse(&source).map_err(|source| LoadError::Parse {
            path: file.to_path_buf(),
            source,
        })?;

        let expected = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let name = unit.name.value;
        if name != expected {
            return Err(LoadError::NamespaceMismatch {
                expected: expected.to_string(),
                found: name,
            });
        }

        let path = match target {
            Some(target) => target.child(&name),
            None => NamespacePath::root(&name)?,
        };
        debug!("execute {} from {}", path, file.display());

        // Дети родителя известны до связывания `def`: одно имя не может быть
        // и определением, и дочерним файлом.
        let expansion = session.rewrite(Declaration::Namespace(NamespaceDecl {
            path: path.clone(),
            file: Some(file.to_path_buf()),
        }))?;

        let mut definitions = Vec::new();
        let mut imports = Vec::new();
        for statement in unit.statements {
            match statement.value {
                Statement::Def(def) => {
                    let bound = path.child(&def);
                    let is_child = expansion.preamble.iter().any(|call| {
                        matches!(&call.target, NamespaceRef::Absolute(target) if *target == bound)
                    });
                    if is_child {
                        let resolver = session.resolver();
                        let child =
                            resolver.locate(resolver.children_dir(file), &def, &path, file)?;
                        return Err(LoadError::ConflictingDefinition {
                            path: bound,
                            file: file.to_path_buf(),
                            child: child.file,
                        });
                    }
                    session.bind(bound);
                    definitions.push(def);
                }
                Statement::Import(import) => imports.push(import),
            }
        }

        self.executed.push(path.clone());
        self.namespaces.insert(
            path.clone(),
            Namespace {
                file: file.to_path_buf(),
                definitions,
                imports: Vec::new(),
            },
        );

        // Дети родителя загружаются до тела.
        session.run_preamble(self, &expansion)?;

        for statement in imports {
            let expansion = session.rewrite(Declaration::Import {
                statement,
                caller: path.clone(),
            })?;
            session.run_preamble(self, &expansion)?;
            if let Declaration::Import { statement, .. } = expansion.declaration {
                self.record_import(&path, statement);
            }
        }

        Ok(())
    }
}

/// Загрузить пакет с корнем `root_file` в новый хост.
pub fn open_package(
    root_file: &Path,
    convention: LayoutConvention,
) -> LoadResult<(LoadSession, ScriptHost)> {
    let mut session = LoadSession::for_package(root_file, convention)?;
    let mut host = ScriptHost::new();
    session.load_package(&mut host, root_file)?;
    Ok((session, host))
}
