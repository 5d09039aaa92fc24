//! Row-major 2D grids shared by every per-cell layer of a run
//!
//! Fire status, fire intensity, and burn probability are all stored as
//! `Grid<T>`. All grids in one run share the same [`GridShape`].

use crate::core_types::sensor::SensorPosition;
use crate::error::DataShapeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid dimensions in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    /// Number of rows (height)
    pub rows: usize,
    /// Number of columns (width)
    pub cols: usize,
}

impl GridShape {
    /// Create a new shape
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of cells, i.e. distinct sensor positions
    pub const fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Check that a position lies inside the grid
    pub const fn contains(&self, pos: SensorPosition) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Flat row-major index of a position
    ///
    /// Callers must pass an in-bounds position.
    #[inline]
    pub const fn index_of(&self, pos: SensorPosition) -> usize {
        pos.row * self.cols + pos.col
    }

    /// Position of a flat row-major index
    #[inline]
    pub const fn position_of(&self, index: usize) -> SensorPosition {
        SensorPosition::new(index / self.cols, index % self.cols)
    }

    /// All positions in row-major (lexical) order
    pub fn positions(&self) -> impl Iterator<Item = SensorPosition> + '_ {
        (0..self.cell_count()).map(move |i| self.position_of(i))
    }

    /// Flat indices of every cell within `offsets` of `center`, clipped to the grid
    ///
    /// `offsets` come from [`disk_offsets`].
    pub fn disk_indices<'a>(
        &'a self,
        center: SensorPosition,
        offsets: &'a [(isize, isize)],
    ) -> impl Iterator<Item = usize> + 'a {
        offsets.iter().filter_map(move |&(dr, dc)| {
            let row = center.row.checked_add_signed(dr)?;
            let col = center.col.checked_add_signed(dc)?;
            let pos = SensorPosition::new(row, col);
            self.contains(pos).then(|| self.index_of(pos))
        })
    }

    /// Check that another grid has this shape
    pub fn ensure_matches(
        &self,
        found: GridShape,
        what: &'static str,
        step: Option<usize>,
    ) -> Result<(), DataShapeError> {
        if *self == found {
            Ok(())
        } else {
            Err(DataShapeError::Mismatch {
                what,
                step,
                expected: *self,
                found,
            })
        }
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Cell offsets within Euclidean distance `radius` of the origin
///
/// Offsets are ordered row-major so iteration over a disk is deterministic.
pub fn disk_offsets(radius: f64) -> Vec<(isize, isize)> {
    if !radius.is_finite() || radius < 0.0 {
        return Vec::new();
    }
    let reach = radius.floor() as isize;
    let radius_sq = radius * radius;
    let mut offsets = Vec::new();
    for dr in -reach..=reach {
        for dc in -reach..=reach {
            let dist_sq = (dr * dr + dc * dc) as f64;
            if dist_sq <= radius_sq {
                offsets.push((dr, dc));
            }
        }
    }
    offsets
}

/// Dense row-major grid of cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    shape: GridShape,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Create a grid with every cell set to `value`
    pub fn filled(shape: GridShape, value: T) -> Self {
        Self {
            shape,
            cells: vec![value; shape.cell_count()],
        }
    }

    /// Build a grid from nested rows
    ///
    /// Rejects empty input and rows of differing length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, DataShapeError> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.is_empty() || cols == 0 {
            return Err(DataShapeError::Empty);
        }
        let shape = GridShape::new(rows.len(), cols);
        let mut cells = Vec::with_capacity(shape.cell_count());
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != cols {
                return Err(DataShapeError::Ragged {
                    row,
                    expected: cols,
                    found: values.len(),
                });
            }
            cells.extend(values);
        }
        Ok(Self { shape, cells })
    }
}

impl<T> Grid<T> {
    /// Wrap a flat row-major buffer
    pub fn from_vec(shape: GridShape, cells: Vec<T>) -> Result<Self, DataShapeError> {
        if shape.cell_count() == 0 {
            return Err(DataShapeError::Empty);
        }
        if cells.len() != shape.cell_count() {
            return Err(DataShapeError::Mismatch {
                what: "flat grid buffer",
                step: None,
                expected: shape,
                found: GridShape::new(1, cells.len()),
            });
        }
        Ok(Self { shape, cells })
    }

    /// Grid dimensions
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Cell at `pos`, or `None` when out of bounds
    pub fn get(&self, pos: SensorPosition) -> Option<&T> {
        self.shape
            .contains(pos)
            .then(|| &self.cells[self.shape.index_of(pos)])
    }

    /// Mutable cell at `pos`, or `None` when out of bounds
    pub fn get_mut(&mut self, pos: SensorPosition) -> Option<&mut T> {
        if self.shape.contains(pos) {
            let idx = self.shape.index_of(pos);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// Row-major cell buffer
    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    /// Mutable row-major cell buffer
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// Iterate rows as slices
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.shape.cols)
    }

    /// Iterate `(position, cell)` pairs in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (SensorPosition, &T)> {
        let shape = self.shape;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, v)| (shape.position_of(i), v))
    }

    /// Apply `f` to every cell, keeping the shape
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            shape: self.shape,
            cells: self.cells.iter().map(f).collect(),
        }
    }
}

impl<T> std::ops::Index<SensorPosition> for Grid<T> {
    type Output = T;

    fn index(&self, pos: SensorPosition) -> &T {
        assert!(
            self.shape.contains(pos),
            "position {pos} outside grid {}",
            self.shape
        );
        &self.cells[self.shape.index_of(pos)]
    }
}

impl<T> std::ops::IndexMut<SensorPosition> for Grid<T> {
    fn index_mut(&mut self, pos: SensorPosition) -> &mut T {
        assert!(
            self.shape.contains(pos),
            "position {pos} outside grid {}",
            self.shape
        );
        let idx = self.shape.index_of(pos);
        &mut self.cells[idx]
    }
}
