//! Per-compilation state
//!
//! Every counter that must be unique within one output file lives here, so
//! two compilations never share state.

use crate::labels::{Label, LabelAllocator};

/// Global addresses, handed out once in first-use order and never reused.
#[derive(Debug, Default)]
pub struct GlobalAllocator {
    next: i64,
}

impl GlobalAllocator {
    pub fn allocate(&mut self, size: i64) -> i64 {
        let address = self.next;
        self.next += size;
        address
    }

    /// Bytes reserved so far.
    pub fn total_size(&self) -> i64 {
        self.next
    }
}

#[derive(Debug, Default)]
pub struct Session {
    pub labels: LabelAllocator,
    pub globals: GlobalAllocator,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&mut self, kind: &str) -> Label {
        self.labels.fresh(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_addresses_are_word_spaced() {
        let mut globals = GlobalAllocator::default();
        assert_eq!(globals.allocate(8), 0);
        assert_eq!(globals.allocate(8), 8);
        assert_eq!(globals.allocate(8), 16);
        assert_eq!(globals.total_size(), 24);
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut first = Session::new();
        first.label("if");
        first.globals.allocate(8);

        let mut second = Session::new();
        assert_eq!(second.label("if").as_str(), "if_0");
        assert_eq!(second.globals.total_size(), 0);
    }
}
