// MIT License - Copyright (c) 2026 Peter Wright
// Raw status storage shared by areas and zones

/// Raw status bits for one entity family.
///
/// The panel reports status as rows, one per sub-state (ready, armed,
/// alarm...). Each row is a run of words; an entity's bit for that row is
/// bit `bank % group_bits` of word `bank / group_bits`. Reading one bit from
/// every row yields the entity's *virtual bank*.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankGrid {
    rows: usize,
    words: usize,
    group_bits: u32,
    cells: Vec<u16>,
}

impl BankGrid {
    pub fn new(rows: usize, words: usize, group_bits: u32) -> Self {
        Self { rows, words, group_bits, cells: vec![0; rows * words] }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn words(&self) -> usize {
        self.words
    }

    pub fn group_bits(&self) -> u32 {
        self.group_bits
    }

    pub fn get(&self, row: usize, word: usize) -> u16 {
        if row < self.rows && word < self.words {
            self.cells[row * self.words + word]
        } else {
            0
        }
    }

    pub fn set(&mut self, row: usize, word: usize, value: u16) {
        if row < self.rows && word < self.words {
            self.cells[row * self.words + word] = value;
        }
    }

    /// Replace a whole row. Missing words are zeroed, extra words dropped.
    pub fn set_row(&mut self, row: usize, values: &[u16]) {
        for word in 0..self.words {
            self.set(row, word, values.get(word).copied().unwrap_or(0));
        }
    }

    /// Replace one word in every row (an area status bank update).
    pub fn set_column(&mut self, word: usize, values: &[u16]) {
        for row in 0..self.rows {
            self.set(row, word, values.get(row).copied().unwrap_or(0));
        }
    }

    /// Whether `bank` falls inside the word range of this grid.
    pub fn covers(&self, bank: usize) -> bool {
        self.group_bits > 0 && bank / (self.group_bits as usize) < self.words
    }

    /// One bit per row for the entity at `bank`.
    pub fn virtual_bank(&self, bank: usize) -> Vec<bool> {
        if !self.covers(bank) {
            return vec![false; self.rows];
        }
        let group = self.group_bits as usize;
        let word = bank / group;
        let mask = 1u16 << (bank % group);
        (0..self.rows).map(|row| self.get(row, word) & mask != 0).collect()
    }
}

/// Render a virtual bank as a `'0'`/`'1'` string in row order.
pub fn render_bank_state(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Advance a local sequence counter. Counters run 1..=255 and wrap to 1.
pub fn next_sequence(sequence: u8) -> u8 {
    if sequence >= u8::MAX {
        1
    } else {
        sequence + 1
    }
}

/// Fixed-capacity storage for entities keyed by bank index.
///
/// A `None` slot is an unused bank (placeholder name on the panel).
#[derive(Debug, Clone)]
pub struct BankArena<T, const N: usize> {
    slots: [Option<T>; N],
}

impl<T, const N: usize> Default for BankArena<T, N> {
    fn default() -> Self {
        Self { slots: std::array::from_fn(|_| None) }
    }
}

impl<T, const N: usize> BankArena<T, N> {
    pub const CAPACITY: usize = N;

    pub fn new() -> Self {
        Self::default()
    }

    /// Place an entity at `bank`. Returns false when the bank is out of range.
    pub fn insert(&mut self, bank: usize, entity: T) -> bool {
        match self.slots.get_mut(bank) {
            Some(slot) => {
                *slot = Some(entity);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, bank: usize) -> Option<&T> {
        self.slots.get(bank).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, bank: usize) -> Option<&mut T> {
        self.slots.get_mut(bank).and_then(Option::as_mut)
    }

    pub fn contains(&self, bank: usize) -> bool {
        self.get(bank).is_some()
    }

    /// In-use entities in bank order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots.iter().enumerate().filter_map(|(bank, slot)| slot.as_ref().map(|e| (bank, e)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(bank, slot)| slot.as_mut().map(|e| (bank, e)))
    }

    pub fn banks(&self) -> Vec<usize> {
        self.iter().map(|(bank, _)| bank).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_bank_byte_groups() {
        let mut grid = BankGrid::new(3, 2, 8);
        grid.set_row(0, &[0b0000_0100, 0]);
        grid.set_row(2, &[0, 0b0000_0001]);

        assert_eq!(grid.virtual_bank(2), vec![true, false, false]);
        assert_eq!(grid.virtual_bank(8), vec![false, false, true]);
        assert_eq!(grid.virtual_bank(0), vec![false, false, false]);
    }

    #[test]
    fn test_virtual_bank_word_groups() {
        let mut grid = BankGrid::new(2, 2, 16);
        grid.set_row(1, &[1 << 15, 1 << 1]);

        assert_eq!(grid.virtual_bank(15), vec![false, true]);
        assert_eq!(grid.virtual_bank(17), vec![false, true]);
        assert_eq!(grid.virtual_bank(16), vec![false, false]);
    }

    #[test]
    fn test_out_of_range_bank_reads_clear() {
        let grid = BankGrid::new(4, 1, 8);
        assert!(!grid.covers(8));
        assert_eq!(grid.virtual_bank(8), vec![false; 4]);
    }

    #[test]
    fn test_set_column_pads_missing_rows() {
        let mut grid = BankGrid::new(3, 2, 8);
        grid.set_row(2, &[0xFF, 0xFF]);
        grid.set_column(1, &[1, 2]);

        assert_eq!(grid.get(0, 1), 1);
        assert_eq!(grid.get(1, 1), 2);
        assert_eq!(grid.get(2, 1), 0);
        assert_eq!(grid.get(2, 0), 0xFF);
    }

    #[test]
    fn test_render_bank_state() {
        assert_eq!(render_bank_state(&[false, true, true, false]), "0110");
    }

    #[test]
    fn test_next_sequence_wraps_to_one() {
        assert_eq!(next_sequence(1), 2);
        assert_eq!(next_sequence(254), 255);
        assert_eq!(next_sequence(255), 1);
    }

    #[test]
    fn test_arena_slots() {
        let mut arena: BankArena<&str, 4> = BankArena::new();
        assert!(arena.insert(0, "front"));
        assert!(arena.insert(3, "garage"));
        assert!(!arena.insert(4, "nowhere"));

        assert_eq!(arena.len(), 2);
        assert_eq!(arena.banks(), vec![0, 3]);
        assert_eq!(arena.get(3), Some(&"garage"));
        assert!(!arena.contains(1));

        arena.clear();
        assert!(arena.is_empty());
    }
}
