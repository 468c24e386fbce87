//! Jump-target labels

use rustc_hash::FxHashMap;
use std::fmt;

/// A symbolic jump target, spelled `{kind}_{n}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out labels with one counter per kind.
///
/// The counter is always the text after the last `_`, so two different
/// (kind, counter) pairs never spell the same label.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    counters: FxHashMap<String, u32>,
}

impl LabelAllocator {
    pub fn fresh(&mut self, kind: &str) -> Label {
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        let label = Label(format!("{}_{}", kind, counter));
        *counter += 1;
        label
    }

    /// One label per kind, for the targets of a single construct.
    pub fn fresh_group<const N: usize>(&mut self, kinds: [&str; N]) -> [Label; N] {
        kinds.map(|kind| self.fresh(kind))
    }

    /// Total number of labels issued.
    pub fn issued(&self) -> u32 {
        self.counters.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_counters_are_per_kind() {
        let mut labels = LabelAllocator::default();
        assert_eq!(labels.fresh("if").as_str(), "if_0");
        assert_eq!(labels.fresh("if").as_str(), "if_1");
        assert_eq!(labels.fresh("while").as_str(), "while_0");
        assert_eq!(labels.issued(), 3);
    }

    #[test]
    fn test_kinds_with_digits_do_not_collide() {
        let mut labels = LabelAllocator::default();
        let mut seen = HashSet::new();
        for _ in 0..12 {
            assert!(seen.insert(labels.fresh("if")));
            assert!(seen.insert(labels.fresh("if1")));
            assert!(seen.insert(labels.fresh("if_1")));
        }
    }

    #[test]
    fn test_group_shares_site() {
        let mut labels = LabelAllocator::default();
        let [a, b] = labels.fresh_group(["then", "else"]);
        assert_eq!((a.as_str(), b.as_str()), ("then_0", "else_0"));
    }
}
