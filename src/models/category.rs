/// Categories seeded when nothing has been stored yet.
pub(crate) const DEFAULT_CATEGORIES: &[&str] =
    &["Food", "Books", "Transport", "Entertainment", "Fees", "Other"];

/// Ordered set of category labels. Insertion order is kept for menus.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Categories {
    names: Vec<String>,
}

impl Categories {
    pub(crate) fn defaults() -> Self {
        Self::from_names(DEFAULT_CATEGORIES.iter().map(|s| s.to_string()))
    }

    /// Build from any list, dropping repeats while keeping first occurrences.
    pub(crate) fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        let mut set = Self::default();
        for name in names {
            set.insert(name);
        }
        set
    }

    /// Returns false when the name was already present.
    pub(crate) fn insert(&mut self, name: String) -> bool {
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Returns false when the name was not present.
    pub(crate) fn remove(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|n| n != name);
        self.names.len() != before
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub(crate) fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
