//! Tree addressing: child-index paths and sibling ranges.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Child-index path from the document root. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    pub fn pop(&mut self) -> Option<usize> {
        self.0.pop()
    }

    /// Returns a new path one level deeper.
    pub fn child(&self, index: usize) -> Self {
        let mut next = self.0.clone();
        next.push(index);
        Self(next)
    }

    /// Splits into `(parent, index)`; `None` for the root path.
    pub fn split_last(&self) -> Option<(Path, usize)> {
        let (last, parent) = self.0.split_last()?;
        Some((Path(parent.to_vec()), *last))
    }

    pub fn parent(&self) -> Option<Path> {
        self.split_last().map(|(parent, _)| parent)
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Whether `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Path) -> bool {
        self.0.len() > ancestor.0.len() && self.0.starts_with(&ancestor.0)
    }
}

impl From<Vec<usize>> for Path {
    fn from(value: Vec<usize>) -> Self {
        Self(value)
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

/// Half-open sibling range `[from, to)` inside the container at `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub parent: Path,
    pub from: usize,
    pub to: usize,
}

impl Range {
    pub fn new(parent: Path, from: usize, to: usize) -> Self {
        Self { parent, from, to }
    }

    /// Range covering exactly the node at `path`.
    pub fn single(path: &Path) -> Option<Self> {
        let (parent, index) = path.split_last()?;
        Some(Self::new(parent, index, index + 1))
    }

    /// Empty range at `path`, used as an insertion point.
    pub fn caret(path: &Path) -> Option<Self> {
        let (parent, index) = path.split_last()?;
        Some(Self::new(parent, index, index))
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}..{}]", self.parent, self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::{Path, Range};

    #[test]
    fn displays_paths_and_ranges() {
        assert_eq!(Path::root().to_string(), "/");
        assert_eq!(Path::from(vec![0, 3]).to_string(), "/0/3");
        assert_eq!(Range::new(Path::from(vec![1]), 2, 4).to_string(), "/1[2..4]");
    }

    #[test]
    fn descendant_check_is_strict() {
        let ancestor = Path::from(vec![1]);
        assert!(Path::from(vec![1, 0]).is_descendant_of(&ancestor));
        assert!(!ancestor.is_descendant_of(&ancestor));
        assert!(!Path::from(vec![2, 0]).is_descendant_of(&ancestor));
    }

    #[test]
    fn single_and_caret_ranges() {
        let path = Path::from(vec![0, 2]);
        assert_eq!(
            Range::single(&path),
            Some(Range::new(Path::from(vec![0]), 2, 3))
        );
        assert!(Range::caret(&path).expect("caret range").is_empty());
        assert!(Range::single(&Path::root()).is_none());
    }
}
