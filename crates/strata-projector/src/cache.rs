/// Fixed-size rolling cache of recently seen stream names.
///
/// `link_to` uses this to skip a `has_stream` check for streams it
/// touched recently. Old entries are overwritten in ring order once
/// the cache is full.
pub struct RollingCache {
    entries: Vec<Option<String>>,
    position: usize,
}

impl RollingCache {
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "cache size must be positive");
        Self {
            entries: vec![None; size],
            // First append lands on index 0
            position: size - 1,
        }
    }

    pub fn rolling_append(&mut self, value: impl Into<String>) {
        self.position = (self.position + 1) % self.entries.len();
        self.entries[self.position] = Some(value.into());
    }

    pub fn has(&self, value: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.as_deref() == Some(value))
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }
}
