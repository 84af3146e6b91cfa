//! Navigation history with push and replace semantics.

/// Browser-style history stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    index: usize,
}

impl History {
    /// Starts a history at `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: vec![initial.into()],
            index: 0,
        }
    }

    /// Current entry.
    pub fn current(&self) -> &str {
        &self.entries[self.index]
    }

    /// Pushes a new entry, dropping any entries past the current one.
    pub fn push(&mut self, path: impl Into<String>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(path.into());
        self.index = self.entries.len() - 1;
    }

    /// Overwrites the current entry.
    pub fn replace(&mut self, path: impl Into<String>) {
        self.entries[self.index] = path.into();
    }

    /// Steps back one entry. Returns the new current entry, or `None` at
    /// the start of history.
    pub fn back(&mut self) -> Option<&str> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(self.current())
    }

    /// Entries up to and including the current one.
    pub fn entries(&self) -> &[String] {
        &self.entries[..=self.index]
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new("/")
    }
}
