//! Grid Store — the authoritative shared canvas.
//!
//! DESIGN
//! ======
//! Dense `Vec<Option<String>>` of `width * height` cells; `None` is the
//! background. Writes are last-write-wins in application order. The grid
//! itself is not synchronized — it lives inside the hub's `RwLock`, so
//! every write happens under the single serialization point and readers
//! never observe a half-applied batch.
//!
//! Out-of-range writes are silently dropped, never stored. A batch larger
//! than the configured maximum is rejected in its entirety before any
//! pair is applied.

use crate::frame::ErrorCode;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("batch exceeds maximum of {max} cells (got {got})")]
    BatchTooLarge { max: usize, got: usize },
}

impl ErrorCode for GridError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BatchTooLarge { .. } => "E_BATCH_TOO_LARGE",
        }
    }
}

/// One cell mutation: `color: None` clears the cell back to background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    pub x: i64,
    pub y: i64,
    pub color: Option<String>,
}

/// Wire key for a cell, `"x,y"`.
#[must_use]
pub fn cell_key(x: i64, y: i64) -> String {
    format!("{x},{y}")
}

/// Parse a wire cell key. Returns `None` for anything malformed.
#[must_use]
pub fn parse_cell_key(key: &str) -> Option<(i64, i64)> {
    let (x, y) = key.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

// =============================================================================
// GRID
// =============================================================================

pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Option<String>>,
}

impl Grid {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, cells: vec![None; width * height] }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Dense index for in-range coordinates, `None` otherwise.
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> Option<&str> {
        self.cells[self.index(x, y)?].as_deref()
    }

    /// Apply one write. Returns `false` (grid unchanged) for out-of-range
    /// coordinates.
    pub fn set(&mut self, x: i64, y: i64, color: Option<String>) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        self.cells[idx] = color;
        true
    }

    /// Apply a batch of writes in order. The whole batch is rejected when
    /// it exceeds `max_cells` — zero pairs applied. Out-of-range pairs are
    /// dropped individually; the applied subset is returned for fan-out.
    pub fn apply_batch(&mut self, writes: Vec<CellWrite>, max_cells: usize) -> Result<Vec<CellWrite>, GridError> {
        if writes.len() > max_cells {
            return Err(GridError::BatchTooLarge { max: max_cells, got: writes.len() });
        }
        let mut applied = Vec::with_capacity(writes.len());
        for write in writes {
            if self.set(write.x, write.y, write.color.clone()) {
                applied.push(write);
            }
        }
        Ok(applied)
    }

    /// Every currently set cell with its last-written color, row-major.
    /// This is the bootstrap snapshot sent to new joiners.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CellWrite> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| {
                let color = cell.clone()?;
                let x = i64::try_from(idx % self.width).ok()?;
                let y = i64::try_from(idx / self.width).ok()?;
                Some(CellWrite { x, y, color: Some(color) })
            })
            .collect()
    }

    /// Count of set (non-background) cells.
    #[must_use]
    pub fn set_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "grid_test.rs"]
mod tests;
