use crate::error::{Error, Result};

/// Guards recursion through nested sequences, maps, records, and reference layers.
#[derive(Clone, Debug)]
pub struct DepthTracker {
    depth: usize,
    max: usize,
}

impl DepthTracker {
    /// Create a new depth tracker
    pub fn new(max: usize) -> Self {
        Self { depth: 0, max }
    }

    /// Step one level deeper, failing if that passes the nesting limit.
    pub fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max {
            self.depth -= 1;
            return Err(Error::ParseLimit(format!(
                "Depth limit of {} exceeded",
                self.max
            )));
        }
        Ok(())
    }

    /// Step back out of a level entered with `enter`.
    pub fn leave(&mut self) {
        debug_assert!(self.depth > 0);
        self.depth = self.depth.saturating_sub(1);
    }
}
