use crate::error::{Error, Result};

/// Tracks the chain of composite records currently being resolved.
///
/// Every composite pushes its slot before resolving children and pops it afterward. A slot that
/// shows up twice on the path is a cycle; a path longer than the limit is too deep to follow.
#[derive(Clone, Debug)]
pub struct DepthTracker {
    path: Vec<u32>,
    max_depth: usize,
}

impl DepthTracker {
    /// Create a new depth tracker
    pub fn new(max_depth: usize) -> Self {
        Self {
            path: Vec::new(),
            max_depth,
        }
    }

    /// Enter a composite record. Fails with [`Error::CyclicReference`] if the slot is already on
    /// the path, or [`Error::ParseLimit`] if entering it would go past the depth limit. Nothing
    /// is pushed on failure.
    pub fn enter(&mut self, slot: u32) -> Result<()> {
        if self.is_active(slot) {
            return Err(Error::CyclicReference { slot });
        }
        if self.depth() >= self.max_depth {
            return Err(Error::ParseLimit(format!(
                "Depth limit of {} exceeded at slot 0x{:x}",
                self.max_depth, slot
            )));
        }
        self.path.push(slot);
        Ok(())
    }

    /// Leave the most recently entered record.
    pub fn leave(&mut self) {
        self.path.pop();
    }

    /// Leave records until only `depth` remain on the path.
    pub fn unwind(&mut self, depth: usize) {
        self.path.truncate(depth);
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn is_active(&self, slot: u32) -> bool {
        self.path.contains(&slot)
    }
}
