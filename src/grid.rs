use std::collections::HashMap;

use crate::hashing::{extend_fnv1a64, fnv1a64};

/// Sparse character grid produced by one render of an animation model.
///
/// Cells are keyed by a packed `(row, col)` pair and hold the raw style token
/// the model emitted. Absent cells are background. A new grid is built for
/// every step; nothing is carried across steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    cells: HashMap<u32, String>,
}

fn pack(row: u16, col: u16) -> u32 {
    (u32::from(row) << 16) | u32::from(col)
}

fn unpack(key: u32) -> (usize, usize) {
    ((key >> 16) as usize, (key & 0xffff) as usize)
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `token` at `(row, col)`, replacing any previous token there.
    /// Negative or unaddressable coordinates are dropped.
    pub fn set(&mut self, row: i64, col: i64, token: impl Into<String>) -> bool {
        let (Ok(row), Ok(col)) = (u16::try_from(row), u16::try_from(col)) else {
            return false;
        };
        self.cells.insert(pack(row, col), token.into());
        true
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        let (Ok(row), Ok(col)) = (u16::try_from(row), u16::try_from(col)) else {
            return None;
        };
        self.cells.get(&pack(row, col)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in row-major order, so consumers draw in a stable order.
    pub fn cells_sorted(&self) -> Vec<(usize, usize, &str)> {
        let mut keys = self.cells.keys().copied().collect::<Vec<_>>();
        keys.sort_unstable();
        keys.into_iter()
            .map(|key| {
                let (row, col) = unpack(key);
                (row, col, self.cells[&key].as_str())
            })
            .collect()
    }

    /// Order-independent content hash.
    pub fn fingerprint(&self) -> u64 {
        let mut hash = fnv1a64(&(self.cells.len() as u64).to_le_bytes());
        for (row, col, token) in self.cells_sorted() {
            extend_fnv1a64(&mut hash, &(row as u64).to_le_bytes());
            extend_fnv1a64(&mut hash, &(col as u64).to_le_bytes());
            extend_fnv1a64(&mut hash, token.as_bytes());
            extend_fnv1a64(&mut hash, &[0]);
        }
        hash
    }
}
