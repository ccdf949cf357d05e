//! Загрузчик: гарантирует, что пространство имён загружено до использования.
//!
//! `LoadSession::ensure_loaded` находит самый глубокий загруженный префикс
//! пути, ищет файл первого недостающего сегмента и загружает ровно его.
//! Оставшаяся часть цепочки догружается рекурсивно, когда загруженный файл
//! сам раскрывает своё объявление.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use super::expand::{self, Declaration, EnsureCall, Expansion};
use super::path::{NamespacePath, NamespaceRef};
use super::registry::{LoadRegistry, NodeKind};
use super::resolver::LayoutResolver;
use super::LayoutConvention;
use crate::error::{LoadError, LoadResult};

/// Примитив загрузки исходника в пространство имён.
///
/// Реализация может повторно входить в сессию (через `ensure_loaded`
/// или `run_preamble`) во время загрузки.
pub trait Load {
    /// Загрузить `file` в пространство `target` (`None` — верхний уровень хоста).
    fn load(
        &mut self,
        session: &mut LoadSession,
        file: &Path,
        target: Option<&NamespacePath>,
    ) -> LoadResult<()>;
}

/// Одна выполненная загрузка.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadEvent {
    /// Путь, ставший загруженным
    pub path: NamespacePath,
    pub kind: NodeKind,
    pub file: PathBuf,
    /// Пространство, в которое загружен файл
    pub target: Option<NamespacePath>,
}

/// Итог `ensure_loaded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// Путь уже был загружен, ничего не сделано.
    AlreadyLoaded,
    /// Загружен один файл.
    Loaded { path: NamespacePath, file: PathBuf },
    /// Ссылка за пределы пакета, оставлена обычному импорту.
    Foreign(NamespacePath),
}

/// Сессия загрузки одного пакета.
#[derive(Debug)]
pub struct LoadSession {
    /// Корень пакета
    root: NamespacePath,
    /// Резолвер раскладки
    resolver: LayoutResolver,
    /// Реестр загруженных путей
    registry: LoadRegistry,
    /// Файлы в процессе загрузки (для детекции циклов)
    loading: Vec<PathBuf>,
    /// Журнал загрузок по порядку вызовов
    trace: Vec<LoadEvent>,
}

impl LoadSession {
    /// Создать сессию для пакета с корнем `root_name`.
    pub fn new(root_name: &str, convention: LayoutConvention) -> LoadResult<Self> {
        Ok(Self {
            root: NamespacePath::root(root_name)?,
            resolver: LayoutResolver::new(convention),
            registry: LoadRegistry::new(),
            loading: Vec::new(),
            trace: Vec::new(),
        })
    }

    /// Создать сессию, взяв имя корня из имени корневого файла.
    pub fn for_package(root_file: &Path, convention: LayoutConvention) -> LoadResult<Self> {
        let stem = root_file
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| LoadError::InvalidPath(root_file.display().to_string()))?;
        Self::new(stem, convention)
    }

    /// Загрузить корневой файл пакета.
    pub fn load_package<H: Load + ?Sized>(
        &mut self,
        host: &mut H,
        root_file: &Path,
    ) -> LoadResult<()> {
        if self.registry.is_loaded(&self.root) {
            debug!("package {} already loaded", self.root);
            return Ok(());
        }

        // Корень отмечается до выполнения его тела.
        self.registry
            .mark_loaded(self.root.clone(), NodeKind::Parent, root_file);
        self.record(self.root.clone(), NodeKind::Parent, root_file, None);
        info!("load package {} from {}", self.root, root_file.display());

        self.load_file(host, root_file, None)
    }

    /// Гарантировать, что `reference` загружен.
    ///
    /// Загружает не более одного файла: первый недостающий сегмент.
    pub fn ensure_loaded<H: Load + ?Sized>(
        &mut self,
        host: &mut H,
        reference: &NamespaceRef,
        caller: &NamespacePath,
    ) -> LoadResult<EnsureOutcome> {
        let path = match self.resolve_internal(reference, caller) {
            Ok(path) => path,
            Err(LoadError::ForeignRootReference(path)) => {
                debug!("{} is outside package {}, skipped", path, self.root);
                return Ok(EnsureOutcome::Foreign(path));
            }
            Err(e) => return Err(e),
        };

        self.ensure_path(host, &path)
    }

    /// Выполнить пролог раскрытого объявления по порядку.
    pub fn run_preamble<H: Load + ?Sized>(
        &mut self,
        host: &mut H,
        expansion: &Expansion,
    ) -> LoadResult<Vec<EnsureOutcome>> {
        expansion
            .preamble
            .iter()
            .map(|call| call.run(self, &mut *host))
            .collect()
    }

    /// Раскрыть объявление в контексте этого пакета.
    pub fn rewrite(&self, declaration: Declaration) -> LoadResult<Expansion> {
        expand::rewrite_declaration(&self.resolver, self.root.root_name(), declaration)
    }

    /// Разрешить ссылку и проверить, что она внутри пакета.
    fn resolve_internal(
        &self,
        reference: &NamespaceRef,
        caller: &NamespacePath,
    ) -> LoadResult<NamespacePath> {
        let path = reference.resolve(caller)?;
        if path.root_name() != self.root.root_name() {
            return Err(LoadError::ForeignRootReference(path));
        }
        Ok(path)
    }

    fn ensure_path<H: Load + ?Sized>(
        &mut self,
        host: &mut H,
        path: &NamespacePath,
    ) -> LoadResult<EnsureOutcome> {
        let depth = self.registry.loaded_depth(path);
        if depth == path.len() {
            debug!("{} already loaded", path);
            return Ok(EnsureOutcome::AlreadyLoaded);
        }

        let enclosing = match path.prefix(depth) {
            Some(enclosing) => enclosing,
            // Корень пакета ещё не загружен: искать негде.
            None => return Err(LoadError::NotAFileContext(self.root.clone())),
        };
        let segment = &path.segments()[depth];
        let node = self
            .registry
            .get(&enclosing)
            .ok_or_else(|| LoadError::NotAFileContext(enclosing.clone()))?;

        let enclosing_file = match (node.kind, &node.file) {
            (NodeKind::Leaf, _) => {
                warn!("{} is a leaf, '{}' is not bound in it", enclosing, segment);
                return Err(LoadError::DefinitionNotFound {
                    segment: segment.clone(),
                    within: enclosing,
                    tried: Vec::new(),
                });
            }
            (NodeKind::Parent, Some(file)) => file.clone(),
            _ => return Err(LoadError::NotAFileContext(enclosing)),
        };

        let dir = self.resolver.children_dir(&enclosing_file);
        let definition = self
            .resolver
            .locate(dir, segment, &enclosing, &enclosing_file)?;
        let target = enclosing.child(segment);

        // Отмечаем до загрузки: взаимные ссылки не должны грузить файл снова.
        self.registry
            .mark_loaded(target.clone(), definition.kind, &definition.file);
        self.record(
            target.clone(),
            definition.kind,
            &definition.file,
            Some(enclosing.clone()),
        );
        info!(
            "load {} from {} into {}",
            target,
            definition.file.display(),
            enclosing
        );

        self.load_file(host, &definition.file, Some(&enclosing))?;

        Ok(EnsureOutcome::Loaded {
            path: target,
            file: definition.file,
        })
    }

    fn load_file<H: Load + ?Sized>(
        &mut self,
        host: &mut H,
        file: &Path,
        target: Option<&NamespacePath>,
    ) -> LoadResult<()> {
        if self.loading.iter().any(|f| f == file) {
            return Err(LoadError::CircularInclude(file.to_path_buf()));
        }

        self.loading.push(file.to_path_buf());
        let result = host.load(self, file, target);
        self.loading.pop();

        result
    }

    fn record(
        &mut self,
        path: NamespacePath,
        kind: NodeKind,
        file: &Path,
        target: Option<NamespacePath>,
    ) {
        self.trace.push(LoadEvent {
            path,
            kind,
            file: file.to_path_buf(),
            target,
        });
    }

    /// Зарегистрировать имя, связанное хостом.
    pub fn bind(&mut self, path: NamespacePath) {
        self.registry.bind(path);
    }

    /// Загружен ли путь.
    pub fn is_loaded(&self, path: &NamespacePath) -> bool {
        self.registry.is_loaded(path)
    }

    /// Корень пакета.
    pub fn root(&self) -> &NamespacePath {
        &self.root
    }

    /// Получить реестр.
    pub fn registry(&self) -> &LoadRegistry {
        &self.registry
    }

    /// Получить резолвер.
    pub fn resolver(&self) -> &LayoutResolver {
        &self.resolver
    }

    /// Журнал загрузок.
    pub fn trace(&self) -> &[LoadEvent] {
        &self.trace
    }
}

impl EnsureCall {
    /// Выполнить вызов в сессии.
    pub fn run<H: Load + ?Sized>(
        &self,
        session: &mut LoadSession,
        host: &mut H,
    ) -> LoadResult<EnsureOutcome> {
        session.ensure_loaded(host, &self.target, &self.caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::expand::NamespaceDecl;
    use std::fs::{self, File};
    use tempfile::{tempdir, TempDir};

    /// Хост, записывающий вызовы `load` и раскрывающий родителей.
    #[derive(Default)]
    struct RecordingHost {
        loads: Vec<(PathBuf, Option<NamespacePath>)>,
    }

    impl Load for RecordingHost {
        fn load(
            &mut self,
            session: &mut LoadSession,
            file: &Path,
            target: Option<&NamespacePath>,
        ) -> LoadResult<()> {
            self.loads.push((file.to_path_buf(), target.cloned()));

            let name = file.file_stem().unwrap().to_str().unwrap();
            let path = match target {
                Some(target) => target.child(name),
                None => NamespacePath::root(name)?,
            };
            let expansion = session.rewrite(Declaration::Namespace(NamespaceDecl {
                path,
                file: Some(file.to_path_buf()),
            }))?;
            session.run_preamble(self, &expansion)?;
            Ok(())
        }
    }

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(&path).unwrap();
        path
    }

    fn ns(s: &str) -> NamespacePath {
        s.parse().unwrap()
    }

    fn reference(s: &str) -> NamespaceRef {
        s.parse().unwrap()
    }

    /// src/App.ns, src/Sub/Sub.ns, src/Sub/Helper.ns
    fn scenario() -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let root = touch(dir.path(), "src/App.ns");
        touch(dir.path(), "src/Sub/Sub.ns");
        touch(dir.path(), "src/Sub/Helper.ns");
        (dir, root)
    }

    /// Сессия с загруженным корнем, но без раскрытия его детей.
    fn seeded_session(root_file: &Path) -> LoadSession {
        let mut session = LoadSession::for_package(root_file, LayoutConvention::default()).unwrap();
        session
            .registry
            .mark_loaded(ns("App"), NodeKind::Parent, root_file);
        session
    }

    #[test]
    fn test_end_to_end_reference_loads_chain_in_order() {
        let (dir, root) = scenario();
        let src = dir.path().join("src");
        let mut session = seeded_session(&root);
        let mut host = RecordingHost::default();

        let outcome = session
            .ensure_loaded(&mut host, &reference("App.Sub.Helper"), &ns("App"))
            .unwrap();

        assert_eq!(
            outcome,
            EnsureOutcome::Loaded {
                path: ns("App.Sub"),
                file: src.join("Sub").join("Sub.ns"),
            }
        );
        assert_eq!(
            host.loads,
            vec![
                (src.join("Sub").join("Sub.ns"), Some(ns("App"))),
                (src.join("Sub").join("Helper.ns"), Some(ns("App.Sub"))),
            ]
        );

        let again = session
            .ensure_loaded(&mut host, &reference("App.Sub.Helper"), &ns("App"))
            .unwrap();
        assert_eq!(again, EnsureOutcome::AlreadyLoaded);
        assert_eq!(host.loads.len(), 2);
    }

    #[test]
    fn test_load_package_expands_root_children() {
        let (dir, root) = scenario();
        touch(dir.path(), "src/Util.ns");
        let mut session = LoadSession::for_package(&root, LayoutConvention::default()).unwrap();
        let mut host = RecordingHost::default();

        session.load_package(&mut host, &root).unwrap();

        let loaded: Vec<String> = session.trace().iter().map(|e| e.path.to_string()).collect();
        assert_eq!(loaded, vec!["App", "App.Sub", "App.Sub.Helper", "App.Util"]);
        assert_eq!(host.loads.len(), 4);
        assert_eq!(session.trace()[0].target, None);

        session.load_package(&mut host, &root).unwrap();
        assert_eq!(host.loads.len(), 4);
    }

    #[test]
    fn test_self_named_reference_does_not_reload() {
        let (_dir, root) = scenario();
        let mut session = LoadSession::for_package(&root, LayoutConvention::default()).unwrap();
        let mut host = RecordingHost::default();
        session.load_package(&mut host, &root).unwrap();
        assert_eq!(host.loads.len(), 3);

        for text in ["App.Sub.Sub", "App.App"] {
            let result = session.ensure_loaded(&mut host, &reference(text), &ns("App"));
            assert!(
                matches!(result, Err(LoadError::DefinitionNotFound { .. })),
                "{} resolved to {:?}",
                text,
                result
            );
        }

        assert_eq!(host.loads.len(), 3);
        let loaded: Vec<String> = session
            .registry()
            .paths()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(loaded, vec!["App", "App.Sub", "App.Sub.Helper"]);
    }

    #[test]
    fn test_idempotent_single_load() {
        let dir = tempdir().unwrap();
        let root = touch(dir.path(), "src/App.ns");
        touch(dir.path(), "src/Util.ns");
        let mut session = seeded_session(&root);
        let mut host = RecordingHost::default();

        session
            .ensure_loaded(&mut host, &reference("App.Util"), &ns("App"))
            .unwrap();
        session
            .ensure_loaded(&mut host, &reference("App.Util"), &ns("App"))
            .unwrap();

        assert_eq!(host.loads.len(), 1);
    }

    #[test]
    fn test_prefix_monotonicity() {
        let (_dir, root) = scenario();
        let mut session = seeded_session(&root);
        let mut host = RecordingHost::default();

        let target = ns("App.Sub.Helper");
        session
            .ensure_loaded(&mut host, &target.clone().into(), &ns("App"))
            .unwrap();

        for prefix in target.prefixes() {
            assert!(session.is_loaded(&prefix), "{} not loaded", prefix);
        }
    }

    #[test]
    fn test_foreign_root_is_skipped() {
        let (_dir, root) = scenario();
        let mut session = seeded_session(&root);
        let mut host = RecordingHost::default();

        let outcome = session
            .ensure_loaded(&mut host, &reference("Base.Collections"), &ns("App"))
            .unwrap();

        assert_eq!(outcome, EnsureOutcome::Foreign(ns("Base.Collections")));
        assert!(host.loads.is_empty());
    }

    #[test]
    fn test_relative_reference() {
        let (dir, root) = scenario();
        let mut session = seeded_session(&root);
        let mut host = RecordingHost::default();

        session
            .ensure_loaded(&mut host, &reference(".Sub"), &ns("App.Caller"))
            .unwrap();
        assert_eq!(host.loads[0].0, dir.path().join("src/Sub/Sub.ns"));

        let too_deep = session.ensure_loaded(&mut host, &reference("...X"), &ns("App.Sub"));
        assert!(matches!(
            too_deep,
            Err(LoadError::InvalidRelativeReference { up: 3, depth: 2 })
        ));
    }

    #[test]
    fn test_missing_definition_is_fatal() {
        let (_dir, root) = scenario();
        let mut session = seeded_session(&root);
        let mut host = RecordingHost::default();

        let result = session.ensure_loaded(&mut host, &reference("App.Nope"), &ns("App"));
        assert!(matches!(result, Err(LoadError::DefinitionNotFound { .. })));
        assert!(host.loads.is_empty());
        assert!(!session.is_loaded(&ns("App.Nope")));
    }

    #[test]
    fn test_ambiguous_definition_is_fatal() {
        let (dir, root) = scenario();
        touch(dir.path(), "src/Sub.ns");
        let mut session = seeded_session(&root);
        let mut host = RecordingHost::default();

        let result = session.ensure_loaded(&mut host, &reference("App.Sub"), &ns("App"));
        assert!(matches!(result, Err(LoadError::AmbiguousDefinition { .. })));
    }

    #[test]
    fn test_name_under_leaf_must_be_bound() {
        let dir = tempdir().unwrap();
        let root = touch(dir.path(), "src/App.ns");
        touch(dir.path(), "src/Util.ns");
        let mut session = seeded_session(&root);
        let mut host = RecordingHost::default();

        session
            .ensure_loaded(&mut host, &reference("App.Util"), &ns("App"))
            .unwrap();
        session.bind(ns("App.Util.parse"));

        let bound = session
            .ensure_loaded(&mut host, &reference("App.Util.parse"), &ns("App"))
            .unwrap();
        assert_eq!(bound, EnsureOutcome::AlreadyLoaded);

        let unbound = session.ensure_loaded(&mut host, &reference("App.Util.render"), &ns("App"));
        assert!(matches!(unbound, Err(LoadError::DefinitionNotFound { .. })));
    }

    #[test]
    fn test_unloaded_root_has_no_context() {
        let mut session = LoadSession::new("App", LayoutConvention::default()).unwrap();
        let mut host = RecordingHost::default();

        let result = session.ensure_loaded(&mut host, &reference("App.Sub"), &ns("App"));
        assert!(matches!(result, Err(LoadError::NotAFileContext(_))));
    }

    /// Хост, который загружает один и тот же файл повторно.
    struct ReentrantHost;

    impl Load for ReentrantHost {
        fn load(
            &mut self,
            session: &mut LoadSession,
            file: &Path,
            _target: Option<&NamespacePath>,
        ) -> LoadResult<()> {
            session.load_file(self, file, None)
        }
    }

    #[test]
    fn test_circular_include_detection() {
        let (_dir, root) = scenario();
        let mut session = LoadSession::for_package(&root, LayoutConvention::default()).unwrap();

        let result = session.load_package(&mut ReentrantHost, &root);
        assert!(matches!(result, Err(LoadError::CircularInclude(_))));
    }
}
