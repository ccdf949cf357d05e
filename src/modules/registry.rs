//! Реестр загруженных пространств имён.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::path::NamespacePath;

/// Вид узла дерева пространств имён.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Узел с детьми (корень или `name/name.ext`).
    Parent,
    /// Одиночный файл без детей.
    Leaf,
    /// Имя, связанное хостом внутри загруженного модуля (не файл).
    Binding,
}

/// Запись реестра.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedNode {
    pub kind: NodeKind,
    /// Файл-источник (нет у привязок хоста)
    pub file: Option<PathBuf>,
}

/// Реестр загруженных путей.
///
/// Растёт монотонно в пределах сессии. Узел попадает сюда до того, как
/// выполнится тело его файла.
#[derive(Debug, Default)]
pub struct LoadRegistry {
    nodes: HashMap<NamespacePath, LoadedNode>,
}

impl LoadRegistry {
    /// Создать пустой реестр.
    pub fn new() -> Self {
        Self::default()
    }

    /// Отметить путь как загруженный из файла.
    pub fn mark_loaded(&mut self, path: NamespacePath, kind: NodeKind, file: &Path) {
        self.nodes.insert(
            path,
            LoadedNode {
                kind,
                file: Some(file.to_path_buf()),
            },
        );
    }

    /// Зарегистрировать имя, уже связанное хостом.
    ///
    /// Существующую запись не перезаписывает.
    pub fn bind(&mut self, path: NamespacePath) {
        self.nodes.entry(path).or_insert(LoadedNode {
            kind: NodeKind::Binding,
            file: None,
        });
    }

    /// Проверить, загружен ли путь.
    pub fn is_loaded(&self, path: &NamespacePath) -> bool {
        self.nodes.contains_key(path)
    }

    /// Получить запись по пути.
    pub fn get(&self, path: &NamespacePath) -> Option<&LoadedNode> {
        self.nodes.get(path)
    }

    /// Длина самого глубокого загруженного префикса `path`.
    ///
    /// Префиксы проверяются от корня вглубь; проверка останавливается на
    /// первом незагруженном, так что дыр в цепочке не бывает.
    pub fn loaded_depth(&self, path: &NamespacePath) -> usize {
        path.prefixes()
            .take_while(|prefix| self.is_loaded(prefix))
            .count()
    }

    /// Количество записей.
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    /// Все загруженные пути в отсортированном порядке.
    pub fn paths(&self) -> Vec<&NamespacePath> {
        let mut paths: Vec<_> = self.nodes.keys().collect();
        paths.sort();
        paths
    }
}
