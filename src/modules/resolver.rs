//! Разрешение имён пространств в файлы по соглашениям раскладки.
//!
//! Для сегмента `name` в каталоге родителя проверяются два кандидата:
//! - `name.ext` — лист;
//! - `name/name.ext` — родитель со своим каталогом.
//!
//! Ровно один из них должен существовать.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use super::path::{is_identifier, NamespacePath};
use super::registry::NodeKind;
use super::LayoutConvention;
use crate::error::{LoadError, LoadResult};

/// Доступ к файловой системе, нужный резолверу.
pub trait SourceTree {
    /// Существует ли обычный файл.
    fn is_file(&self, path: &Path) -> bool;

    /// Существует ли каталог.
    fn is_dir(&self, path: &Path) -> bool;

    /// Записи каталога (полные пути).
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Реальная файловая система.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSourceTree;

impl SourceTree for OsSourceTree {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}

/// Результат поиска файла для сегмента.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// `name.ext`
    Leaf(PathBuf),
    /// `name/name.ext`
    Parent(PathBuf),
    /// Существуют оба кандидата.
    Ambiguous { leaf: PathBuf, parent: PathBuf },
    /// Не существует ни один.
    NotFound { tried: Vec<PathBuf> },
}

/// Найденное определение сегмента.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub kind: NodeKind,
    pub file: PathBuf,
}

/// Резолвер раскладки исходников.
#[derive(Debug, Clone)]
pub struct LayoutResolver<T: SourceTree = OsSourceTree> {
    tree: T,
    convention: LayoutConvention,
}

impl LayoutResolver<OsSourceTree> {
    /// Резолвер поверх реальной файловой системы.
    pub fn new(convention: LayoutConvention) -> Self {
        Self::with_tree(OsSourceTree, convention)
    }
}

impl Default for LayoutResolver<OsSourceTree> {
    fn default() -> Self {
        Self::new(LayoutConvention::default())
    }
}

impl<T: SourceTree> LayoutResolver<T> {
    /// Резолвер поверх произвольного источника файлов.
    pub fn with_tree(tree: T, convention: LayoutConvention) -> Self {
        Self { tree, convention }
    }

    /// Соглашения раскладки.
    pub fn convention(&self) -> &LayoutConvention {
        &self.convention
    }

    /// Путь к файлу `name.ext` в каталоге.
    pub fn source_file(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.{}", name, self.convention.extension))
    }

    /// Каталог, в котором лежат дети узла с данным файлом.
    pub fn children_dir<'a>(&self, file: &'a Path) -> &'a Path {
        file.parent().unwrap_or_else(|| Path::new("."))
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension() == Some(OsStr::new(&self.convention.extension))
    }

    /// Классифицировать сегмент `segment` в каталоге `dir`.
    pub fn classify(&self, dir: &Path, segment: &str) -> Located {
        let leaf = self.source_file(dir, segment);
        let parent = self.source_file(&dir.join(segment), segment);

        match (self.tree.is_file(&leaf), self.tree.is_file(&parent)) {
            (true, true) => Located::Ambiguous { leaf, parent },
            (true, false) => Located::Leaf(leaf),
            (false, true) => Located::Parent(parent),
            (false, false) => Located::NotFound {
                tried: vec![leaf, parent],
            },
        }
    }

    /// Классифицировать сегмент, не считая `exclude` кандидатом в листья.
    ///
    /// `exclude` — файл самого родителя: `App.Sub.Sub` не может указывать
    /// на `Sub/Sub.ns`, который уже загружен как `App.Sub`.
    pub fn classify_excluding(&self, dir: &Path, segment: &str, exclude: &Path) -> Located {
        match self.classify(dir, segment) {
            Located::Leaf(leaf) if leaf == exclude => Located::NotFound {
                tried: vec![leaf, self.source_file(&dir.join(segment), segment)],
            },
            Located::Ambiguous { leaf, parent } if leaf == exclude => Located::Parent(parent),
            other => other,
        }
    }

    /// Найти файл сегмента, превращая неудачу в ошибку.
    pub fn locate(
        &self,
        dir: &Path,
        segment: &str,
        within: &NamespacePath,
        exclude: &Path,
    ) -> LoadResult<Definition> {
        match self.classify_excluding(dir, segment, exclude) {
            Located::Leaf(file) => {
                debug!("{}.{}: leaf {}", within, segment, file.display());
                Ok(Definition {
                    kind: NodeKind::Leaf,
                    file,
                })
            }
            Located::Parent(file) => {
                debug!("{}.{}: parent {}", within, segment, file.display());
                Ok(Definition {
                    kind: NodeKind::Parent,
                    file,
                })
            }
            Located::Ambiguous { leaf, parent } => Err(LoadError::AmbiguousDefinition {
                segment: segment.to_string(),
                leaf,
                parent,
            }),
            Located::NotFound { tried } => Err(LoadError::DefinitionNotFound {
                segment: segment.to_string(),
                within: within.clone(),
                tried,
            }),
        }
    }

    /// Является ли узел `path`, объявленный в файле `file`, родителем.
    ///
    /// Путь верхнего уровня — всегда родитель. В каталоге корня пакета
    /// (`src`) родитель только он, остальные файлы там — листья. Глубже
    /// родитель — файл, чьё имя совпадает с именем каталога и с последним
    /// сегментом пути.
    pub fn is_parent(&self, file: &Path, path: &NamespacePath) -> bool {
        if path.len() == 1 {
            return true;
        }

        let dir_name = match file.parent().and_then(Path::file_name) {
            Some(name) => name,
            None => return false,
        };
        if dir_name == OsStr::new(&self.convention.root_dir_name) {
            return false;
        }

        self.has_source_extension(file)
            && file.file_stem() == Some(dir_name)
            && dir_name == OsStr::new(path.last())
    }

    /// Перечислить детей родителя, лежащих в каталоге `dir`.
    ///
    /// Каждый файл с расширением исходников (кроме `exclude`) — кандидат в
    /// листья, каждый подкаталог с одноимённым файлом — кандидат в
    /// родители. Результат отсортирован и без повторов.
    pub fn list_children(&self, dir: &Path, exclude: &Path) -> LoadResult<Vec<String>> {
        let mut children = BTreeSet::new();

        for entry in self.tree.read_dir(dir)? {
            let name = match entry.file_name().and_then(OsStr::to_str) {
                Some(name) => name,
                None => continue,
            };

            if self.tree.is_file(&entry) {
                if !self.has_source_extension(&entry) || entry.file_name() == exclude.file_name() {
                    continue;
                }
                if let Some(stem) = entry.file_stem().and_then(OsStr::to_str) {
                    if is_identifier(stem) {
                        trace!("child leaf candidate {}", entry.display());
                        children.insert(stem.to_string());
                    }
                }
            } else if self.tree.is_dir(&entry)
                && is_identifier(name)
                && self.tree.is_file(&self.source_file(&entry, name))
            {
                trace!("child parent candidate {}", entry.display());
                children.insert(name.to_string());
            }
        }

        Ok(children.into_iter().collect())
    }
}
