/// Basin identifiers.
///
/// Every per-basin artifact (parameter file, metrics directory, table column)
/// is keyed by a `BasinId`. Keeping the id a distinct type prevents it from
/// being confused with the many other strings floating through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BasinId(String);

impl BasinId {
    /// Create a new basin id from a non-empty string.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        debug_assert!(!id.is_empty(), "basin id must not be empty");
        Self(id)
    }

    /// Return the basin id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BasinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BasinId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
