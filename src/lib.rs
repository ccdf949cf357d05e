//! # nestload
//!
//! Ленивая иерархическая загрузка пространств имён по раскладке каталогов.
//!
//! ## Основные модули
//!
//! - [`modules`] - пути, резолвер раскладки, реестр, загрузчик, раскрытие объявлений
//! - [`parser`] - парсер языка объявлений эталонного хоста
//! - [`host`] - эталонный хост, реализующий примитив загрузки
//! - [`error`] - ошибки загрузки
//!
//! ## Пример
//!
//! ```rust,ignore
//! use nestload::{open_package, LayoutConvention};
//!
//! let (session, host) = open_package("pkg/src/App.ns".as_ref(), LayoutConvention::default())?;
//! for event in session.trace() {
//!     println!("{} <- {}", event.path, event.file.display());
//! }
//! ```

pub mod error;
pub mod host;
pub mod modules;
pub mod parser;

// === Re-exports для удобства ===
pub use error::{LoadError, LoadResult};
pub use host::{open_package, ScriptHost};
pub use modules::{
    EnsureOutcome, LayoutConvention, LayoutResolver, Load, LoadEvent, LoadSession, NamespacePath,
    NamespaceRef,
};
