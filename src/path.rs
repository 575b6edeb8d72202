use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Separator used when no other one is configured.
pub const DEFAULT_SEPARATOR: char = '.';

/// Path segment meaning "go to the parent mask".
pub const PARENT: &str = "..";

/// A hierarchical name such as `self.speed` or `..sibling`.
///
/// Paths are used both as literal functors and as mask addresses. Segments are
/// shared `Arc<str>`s, so cloning or re-prefixing a path never copies text.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: SmallVec<[Arc<str>; 4]>,
}

impl Path {
    /// The empty path.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a path using the default `.` separator.
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, DEFAULT_SEPARATOR)
    }

    /// Parse a path with a custom separator.
    ///
    /// Outside a name, every `..` is a parent segment and a lone separator only
    /// delimits; a name runs up to the next separator. With the default
    /// separator `..speed` reads as `..`, `speed`, `a.b..` as `a`, `b`, `..`
    /// and both `a..b` and `a...b` as `a`, `..`, `b`. Empty segments are
    /// dropped.
    pub fn parse_with(text: &str, separator: char) -> Self {
        let mut segments: SmallVec<[Arc<str>; 4]> = SmallVec::new();
        let mut rest = text;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix(PARENT) {
                segments.push(Arc::from(PARENT));
                rest = after;
                continue;
            }
            if let Some(after) = rest.strip_prefix(separator) {
                rest = after;
                continue;
            }
            let end = rest.find(separator).unwrap_or(rest.len());
            segments.push(Arc::from(&rest[..end]));
            rest = &rest[end..];
        }

        Self { segments }
    }

    /// Build a path from already split segments. Empty segments are dropped.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            segments: segments
                .into_iter()
                .filter(|s| !s.as_ref().is_empty())
                .map(|s| Arc::from(s.as_ref()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.segments.iter().map(|s| s.as_ref())
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(|s| s.as_ref())
    }

    pub fn first(&self) -> Option<&str> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_ref())
    }

    /// Shared handle to the last segment.
    pub(crate) fn last_shared(&self) -> Option<&Arc<str>> {
        self.segments.last()
    }

    /// Everything but the last segment.
    pub fn parent(&self) -> Path {
        let n = self.segments.len().saturating_sub(1);
        Self {
            segments: self.segments[..n].iter().cloned().collect(),
        }
    }

    /// Everything but the first segment.
    pub fn tail(&self) -> Path {
        Self {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    /// Segments `from..to`, clamped to the path length.
    pub fn sub_path(&self, from: usize, to: usize) -> Path {
        let to = to.min(self.segments.len());
        let from = from.min(to);
        Self {
            segments: self.segments[from..to].iter().cloned().collect(),
        }
    }

    pub fn push(&mut self, segment: impl AsRef<str>) {
        let segment = segment.as_ref();
        if !segment.is_empty() {
            self.segments.push(Arc::from(segment));
        }
    }

    pub(crate) fn push_shared(&mut self, segment: Arc<str>) {
        self.segments.push(segment);
    }

    /// `self` followed by `other`.
    pub fn append(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// `prefix` followed by `self`.
    pub fn prepend(&self, prefix: &Path) -> Path {
        prefix.append(self)
    }

    /// `self` with one more segment.
    pub fn join(&self, segment: impl AsRef<str>) -> Path {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self
                .segments
                .iter()
                .zip(prefix.segments.iter())
                .all(|(a, b)| a == b)
    }

    /// Render with an explicit separator.
    pub fn render(&self, separator: char) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            out.push_str(segment);
        }
        out
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(DEFAULT_SEPARATOR))
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self)
    }
}

impl From<&str> for Path {
    fn from(text: &str) -> Self {
        Path::parse(text)
    }
}

impl From<String> for Path {
    fn from(text: String) -> Self {
        Path::parse(&text)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dotted_path() {
        let path = Path::parse("a.b.c");
        assert_eq!(path.len(), 3);
        assert_eq!(path.first(), Some("a"));
        assert_eq!(path.last(), Some("c"));
        assert_eq!(path.to_string(), "a.b.c");
    }

    #[test]
    fn parse_drops_empty_segments() {
        assert_eq!(Path::parse(""), Path::empty());
        assert_eq!(Path::parse("a.b."), Path::parse("a.b"));
    }

    #[test]
    fn parse_parent_segments() {
        let segments = |text: &str| -> Vec<String> {
            Path::parse(text).segments().map(str::to_string).collect()
        };
        assert_eq!(segments("..speed"), vec!["..", "speed"]);
        assert_eq!(segments(".."), vec![".."]);
        assert_eq!(segments("a.b.."), vec!["a", "b", ".."]);
        assert_eq!(segments("a..b"), vec!["a", "..", "b"]);
        assert_eq!(segments("a...b"), vec!["a", "..", "b"]);
        assert_eq!(segments("a....b"), vec!["a", "..", "..", "b"]);
        assert_eq!(segments("....x"), vec!["..", "..", "x"]);
    }

    #[test]
    fn custom_separator_keeps_dots_inside_names() {
        let path = Path::parse_with("v1.2/..//x..y/..", '/');
        assert_eq!(
            path.segments().collect::<Vec<_>>(),
            vec!["v1.2", "..", "x..y", ".."]
        );
    }

    #[test]
    fn parse_with_custom_separator() {
        let path = Path::parse_with("../self/speed", '/');
        assert_eq!(
            path.segments().collect::<Vec<_>>(),
            vec!["..", "self", "speed"]
        );
        assert_eq!(path.render('/'), "../self/speed");
    }

    #[test]
    fn parent_tail_and_sub_path() {
        let path = Path::parse("a.b.c");
        assert_eq!(path.parent(), Path::parse("a.b"));
        assert_eq!(path.tail(), Path::parse("b.c"));
        assert_eq!(path.sub_path(1, 2), Path::parse("b"));
        assert_eq!(path.sub_path(2, 10), Path::parse("c"));
        assert!(Path::empty().parent().is_empty());
    }

    #[test]
    fn append_prepend_and_starts_with() {
        let a = Path::parse("self");
        let b = Path::parse("speed");
        assert_eq!(b.prepend(&a), Path::parse("self.speed"));
        assert_eq!(a.append(&b), Path::parse("self.speed"));
        assert!(Path::parse("self.speed").starts_with(&a));
        assert!(!a.starts_with(&Path::parse("self.speed")));
        assert_eq!(a.join("x"), Path::parse("self.x"));
    }
}
