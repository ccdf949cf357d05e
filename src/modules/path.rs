//! Пути пространств имён и разрешение относительных ссылок.
//!
//! Абсолютный путь — непустая последовательность сегментов (`App.Sub.Helper`),
//! первый сегмент всегда имя корня пакета. Относительная ссылка начинается
//! с точек: число точек — сколько хвостовых сегментов пути вызывающего
//! отбросить перед добавлением своих сегментов (`.Other`, `..Util.Json`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadResult};

/// Проверить, что сегмент — идентификатор.
pub fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Разбить текст по точкам, проверив каждый сегмент.
fn split_segments(text: &str, original: &str) -> LoadResult<Vec<String>> {
    let segments: Vec<String> = text.split('.').map(str::to_string).collect();
    if segments.iter().any(|s| !is_identifier(s)) {
        return Err(LoadError::InvalidPath(original.to_string()));
    }
    Ok(segments)
}

/// Абсолютный путь пространства имён.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespacePath {
    segments: Vec<String>,
}

impl NamespacePath {
    /// Создать путь из сегментов.
    pub fn new<I, S>(segments: I) -> LoadResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| !is_identifier(s)) {
            return Err(LoadError::InvalidPath(segments.join(".")));
        }
        Ok(Self { segments })
    }

    /// Путь из одного сегмента — корень пакета.
    pub fn root(name: &str) -> LoadResult<Self> {
        Self::new([name])
    }

    /// Сегменты пути.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Глубина пути.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Путь никогда не бывает пустым.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Первый сегмент.
    pub fn root_name(&self) -> &str {
        &self.segments[0]
    }

    /// Последний сегмент.
    pub fn last(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Дочерний путь.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// Родительский путь (`None` для корня).
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() == 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Префикс из первых `len` сегментов.
    pub fn prefix(&self, len: usize) -> Option<Self> {
        if len == 0 || len > self.segments.len() {
            return None;
        }
        Some(Self {
            segments: self.segments[..len].to_vec(),
        })
    }

    /// Все префиксы от корня к самому пути.
    pub fn prefixes(&self) -> impl Iterator<Item = NamespacePath> + '_ {
        (1..=self.segments.len()).filter_map(move |len| self.prefix(len))
    }

    /// Является ли `self` префиксом `other` (включая равенство).
    pub fn is_prefix_of(&self, other: &NamespacePath) -> bool {
        other.segments.starts_with(&self.segments)
    }
}

impl fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for NamespacePath {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            segments: split_segments(s, s)?,
        })
    }
}

impl TryFrom<String> for NamespacePath {
    type Error = LoadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NamespacePath> for String {
    fn from(path: NamespacePath) -> Self {
        path.to_string()
    }
}

/// Ссылка на пространство имён, абсолютная или относительная.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespaceRef {
    /// Уже абсолютный путь.
    Absolute(NamespacePath),
    /// `up` точек и хвостовые сегменты.
    Relative { up: usize, segments: Vec<String> },
}

impl NamespaceRef {
    /// Создать относительную ссылку.
    pub fn relative<I, S>(up: usize, segments: I) -> LoadResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if up == 0 || segments.is_empty() || segments.iter().any(|s| !is_identifier(s)) {
            return Err(LoadError::InvalidPath(format!(
                "{}{}",
                ".".repeat(up),
                segments.join(".")
            )));
        }
        Ok(Self::Relative { up, segments })
    }

    /// Относительная ли ссылка.
    pub fn is_relative(&self) -> bool {
        matches!(self, Self::Relative { .. })
    }

    /// Сегменты ссылки без учёта относительного маркера.
    pub fn segments(&self) -> &[String] {
        match self {
            Self::Absolute(path) => path.segments(),
            Self::Relative { segments, .. } => segments,
        }
    }

    /// Присоединить сегменты к ссылке (для формы `base: item`).
    pub fn join(&self, tail: &[String]) -> Self {
        match self {
            Self::Absolute(path) => {
                let mut joined = path.clone();
                for segment in tail {
                    joined = joined.child(segment);
                }
                Self::Absolute(joined)
            }
            Self::Relative { up, segments } => Self::Relative {
                up: *up,
                segments: segments.iter().chain(tail).cloned().collect(),
            },
        }
    }

    /// Разрешить ссылку относительно пути вызывающего.
    ///
    /// Абсолютная ссылка возвращается как есть. Для относительной с `up = k`
    /// от пути вызывающего отбрасываются последние `k` сегментов.
    pub fn resolve(&self, caller: &NamespacePath) -> LoadResult<NamespacePath> {
        match self {
            Self::Absolute(path) => Ok(path.clone()),
            Self::Relative { up, segments } => {
                if *up > caller.len() {
                    return Err(LoadError::InvalidRelativeReference {
                        up: *up,
                        depth: caller.len(),
                    });
                }
                let kept = &caller.segments()[..caller.len() - up];
                NamespacePath::new(kept.iter().chain(segments).cloned())
            }
        }
    }
}

impl From<NamespacePath> for NamespaceRef {
    fn from(path: NamespacePath) -> Self {
        Self::Absolute(path)
    }
}

impl fmt::Display for NamespaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(path) => write!(f, "{}", path),
            Self::Relative { up, segments } => {
                write!(f, "{}{}", ".".repeat(*up), segments.join("."))
            }
        }
    }
}

impl FromStr for NamespaceRef {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let up = s.chars().take_while(|&c| c == '.').count();
        if up == 0 {
            return Ok(Self::Absolute(s.parse()?));
        }
        let segments = split_segments(&s[up..], s)?;
        Ok(Self::Relative { up, segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> NamespacePath {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_absolute() {
        let p = path("App.Sub.Helper");
        assert_eq!(p.len(), 3);
        assert_eq!(p.root_name(), "App");
        assert_eq!(p.last(), "Helper");
        assert_eq!(p.to_string(), "App.Sub.Helper");
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!("".parse::<NamespacePath>().is_err());
        assert!("App..Sub".parse::<NamespacePath>().is_err());
        assert!("App.".parse::<NamespacePath>().is_err());
        assert!("App.1x".parse::<NamespacePath>().is_err());
        assert!("...".parse::<NamespaceRef>().is_err());
    }

    #[test]
    fn test_segments_are_case_sensitive() {
        assert_ne!(path("App.Sub"), path("App.sub"));
        assert_eq!(path("App.Sub"), NamespacePath::new(["App", "Sub"]).unwrap());
    }

    #[test]
    fn test_parent_and_prefixes() {
        let p = path("A.B.C");
        assert_eq!(p.parent(), Some(path("A.B")));
        assert_eq!(path("A").parent(), None);

        let prefixes: Vec<String> = p.prefixes().map(|p| p.to_string()).collect();
        assert_eq!(prefixes, vec!["A", "A.B", "A.B.C"]);

        assert!(path("A.B").is_prefix_of(&p));
        assert!(p.is_prefix_of(&p));
        assert!(!path("A.C").is_prefix_of(&p));
    }

    #[test]
    fn test_parse_relative() {
        let r: NamespaceRef = "..Util.Json".parse().unwrap();
        assert_eq!(
            r,
            NamespaceRef::Relative {
                up: 2,
                segments: vec!["Util".to_string(), "Json".to_string()],
            }
        );
        assert_eq!(r.to_string(), "..Util.Json");
        assert!(r.is_relative());
    }

    #[test]
    fn test_resolve_absolute_is_unchanged() {
        let r: NamespaceRef = "Other.X".parse().unwrap();
        assert_eq!(r.resolve(&path("A.B")).unwrap(), path("Other.X"));
    }

    #[test]
    fn test_resolve_relative() {
        let caller = path("A.B.C");
        let r = NamespaceRef::relative(2, ["D"]).unwrap();
        assert_eq!(r.resolve(&caller).unwrap(), path("A.D"));

        let sibling: NamespaceRef = ".E".parse().unwrap();
        assert_eq!(sibling.resolve(&caller).unwrap(), path("A.B.E"));

        let top = NamespaceRef::relative(3, ["D"]).unwrap();
        assert_eq!(top.resolve(&caller).unwrap(), path("D"));
    }

    #[test]
    fn test_resolve_relative_too_deep() {
        let caller = path("A.B.C");
        let r = NamespaceRef::relative(4, ["D"]).unwrap();
        assert!(matches!(
            r.resolve(&caller),
            Err(LoadError::InvalidRelativeReference { up: 4, depth: 3 })
        ));
    }

    #[test]
    fn test_relative_requires_positive_up_count() {
        assert!(NamespaceRef::relative(0, ["D"]).is_err());
        assert!(NamespaceRef::relative(1, Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_join_items() {
        let base: NamespaceRef = "App.Sub".parse().unwrap();
        let joined = base.join(&["Helper".to_string()]);
        assert_eq!(joined, NamespaceRef::Absolute(path("App.Sub.Helper")));

        let rel: NamespaceRef = ".Sub".parse().unwrap();
        assert_eq!(rel.join(&["X".to_string()]).to_string(), ".Sub.X");
    }

    #[test]
    fn test_serde_as_dotted_string() {
        let json = serde_json::to_string(&path("App.Sub")).unwrap();
        assert_eq!(json, "\"App.Sub\"");
        let back: NamespacePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path("App.Sub"));
        assert!(serde_json::from_str::<NamespacePath>("\"App..\"").is_err());
    }
}
