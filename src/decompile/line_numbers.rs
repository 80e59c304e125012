use crate::attribute_info::LineNumberTableEntry;

/// Maps program counters to source lines.
#[derive(Clone, Debug, Default)]
pub struct LineNumberCounter {
    /// Sorted by `start_pc`.
    entries: Vec<LineNumberTableEntry>,
}

impl LineNumberCounter {
    pub fn new(entries: &[LineNumberTableEntry]) -> Self {
        let mut entries = entries.to_vec();
        entries.sort_by_key(|e| e.start_pc);
        LineNumberCounter { entries }
    }

    /// Line of the entry with the largest `start_pc` not after `pc`.
    pub fn line_at(&self, pc: u32) -> Option<u16> {
        let after = self.entries.partition_point(|e| e.start_pc as u32 <= pc);
        after.checked_sub(1).map(|i| self.entries[i].line_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_at() {
        let counter = LineNumberCounter::new(&[
            LineNumberTableEntry {
                start_pc: 6,
                line_number: 21,
            },
            LineNumberTableEntry {
                start_pc: 2,
                line_number: 20,
            },
        ]);
        assert_eq!(counter.line_at(0), None);
        assert_eq!(counter.line_at(2), Some(20));
        assert_eq!(counter.line_at(5), Some(20));
        assert_eq!(counter.line_at(6), Some(21));
        assert_eq!(counter.line_at(100), Some(21));
        assert_eq!(LineNumberCounter::default().line_at(3), None);
    }
}
