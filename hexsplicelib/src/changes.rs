//! Sparse record of pending byte edits keyed by absolute file offset.

use std::collections::BTreeMap;
use std::ops::Range;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeMap {
    entries: BTreeMap<usize, u8>,
}

impl ChangeMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Records `value` as the new content of the byte at `offset`,
    /// replacing any earlier pending value for it.
    pub fn record(&mut self, offset: usize, value: u8) {
        self.entries.insert(offset, value);
    }

    #[must_use]
    pub fn get(&self, offset: usize) -> Option<u8> {
        self.entries.get(&offset).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending changes in ascending offset order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.entries.iter().map(|(&offset, &value)| (offset, value))
    }

    /// Pending changes that fall within `range`.
    pub fn in_range(&self, range: Range<usize>) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.entries
            .range(range)
            .map(|(&offset, &value)| (offset, value))
    }

    /// Patches `buf`, which holds the bytes starting at absolute `offset`,
    /// with the pending values that fall inside it.
    pub fn overlay(&self, offset: usize, buf: &mut [u8]) {
        for (addr, value) in self.in_range(offset..offset + buf.len()) {
            buf[addr - offset] = value;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_replaces_previous_value() {
        // Arrange
        let mut changes = ChangeMap::new();

        // Act
        changes.record(0x10, 0xAA);
        changes.record(0x10, 0xBB);

        // Assert
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get(0x10), Some(0xBB));
    }

    #[test]
    fn test_overlay_only_touches_covered_offsets() {
        // Arrange
        let mut changes = ChangeMap::new();
        changes.record(3, 0x11);
        changes.record(5, 0x22);
        changes.record(9, 0x33);
        let mut buf = [0u8; 4]; // covers offsets 4..8

        // Act
        changes.overlay(4, &mut buf);

        // Assert
        assert_eq!(buf, [0x00, 0x22, 0x00, 0x00]);
    }

    #[test]
    fn test_iter_is_sorted() {
        // Arrange
        let mut changes = ChangeMap::new();
        changes.record(0x30, 1);
        changes.record(0x10, 2);
        changes.record(0x20, 3);

        // Act
        let offsets: Vec<usize> = changes.iter().map(|(offset, _)| offset).collect();

        // Assert
        assert_eq!(offsets, vec![0x10, 0x20, 0x30]);
    }
}
