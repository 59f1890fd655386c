//! Collision-free layer names for one export run

use std::collections::HashSet;

/// Names already handed out during a run.
///
/// Reserving a name that is taken yields `<name>_<k>` with the smallest
/// `k >= 1` that is still free at that moment. Names compare
/// case-insensitively because container layer names do.
#[derive(Debug, Default, Clone)]
pub struct UsedNames {
    names: HashSet<String>,
}

impl UsedNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a unique name derived from `base` and reserve it.
    pub fn reserve(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut k = 1usize;
        while self.contains(&candidate) {
            candidate = format!("{base}_{k}");
            k += 1;
        }
        self.names.insert(candidate.to_lowercase());
        candidate
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
