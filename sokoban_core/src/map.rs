use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::{Direction, Position};

/// Represents errors that can occur when building a grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Expected {expected} cells for a {rows}x{cols} grid, found {found}")]
    SizeMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
        found: usize,
    },
}

/// A fixed-size 2D grid.
///
/// Stores elements of type `T` in a flat vector using row-major order and is
/// addressed by [`Position`] (row, column). The dimensions never change after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a grid from cells already laid out in row-major order.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<T>) -> Result<Self, GridError> {
        let expected = rows.saturating_mul(cols);
        if cells.len() != expected {
            return Err(GridError::SizeMismatch {
                rows,
                cols,
                expected,
                found: cells.len(),
            });
        }
        Ok(Grid { rows, cols, cells })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Converts a position to a flat vector index.
    ///
    /// Returns `None` if the position is out of bounds.
    #[inline]
    fn index_of(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.row * self.cols + pos.col)
        } else {
            None
        }
    }

    /// Checks if the given position lies within the grid boundaries.
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Returns the in-bounds neighbour of `pos` in `direction`, if any.
    pub fn neighbor(&self, pos: Position, direction: Direction) -> Option<Position> {
        pos.step(direction).filter(|next| self.contains(*next))
    }

    pub fn get(&self, pos: Position) -> Option<&T> {
        let index = self.index_of(pos)?;
        self.cells.get(index)
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let cols = self.cols;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                Position {
                    row: index / cols,
                    col: index % cols,
                },
                cell,
            )
        })
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, pos: Position) -> &Self::Output {
        match self.index_of(pos) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size {}x{}",
                pos, self.rows, self.cols
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, pos: Position) -> &mut Self::Output {
        let (rows, cols) = (self.rows, self.cols);
        match self.index_of(pos) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size {}x{}",
                pos, rows, cols
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(rows: usize, cols: usize) -> Grid<usize> {
        Grid::from_cells(rows, cols, (0..rows * cols).collect()).unwrap()
    }

    #[test]
    fn cells_are_laid_out_row_major() {
        let grid = numbered(2, 3);
        assert_eq!(grid.dimensions(), (2, 3));
        assert_eq!(grid[Position::new(0, 2)], 2);
        assert_eq!(grid[Position::new(1, 0)], 3);
        assert_eq!(grid[Position::new(1, 2)], 5);
    }

    #[test]
    fn out_of_bounds_access_is_rejected() {
        let grid = numbered(2, 2);
        assert_eq!(grid.get(Position::new(2, 0)), None);
        assert_eq!(grid.get(Position::new(0, 2)), None);
        assert!(!grid.contains(Position::new(1, 2)));
        assert_eq!(grid.get(Position::new(1, 1)), Some(&3));
    }

    #[test]
    fn neighbor_stays_inside_the_grid() {
        let grid = numbered(3, 3);
        let corner = Position::new(0, 0);
        assert_eq!(grid.neighbor(corner, Direction::Up), None);
        assert_eq!(grid.neighbor(corner, Direction::Left), None);
        assert_eq!(
            grid.neighbor(corner, Direction::Right),
            Some(Position::new(0, 1))
        );
        assert_eq!(grid.neighbor(Position::new(2, 2), Direction::Down), None);
    }

    #[test]
    fn from_cells_checks_length() {
        assert!(Grid::from_cells(2, 2, vec![0u8; 4]).is_ok());
        assert!(matches!(
            Grid::from_cells(2, 2, vec![0u8; 3]),
            Err(GridError::SizeMismatch { expected: 4, found: 3, .. })
        ));
    }

    #[test]
    fn enumerate_reports_positions() {
        let grid = numbered(2, 3);
        for (pos, cell) in grid.enumerate() {
            assert_eq!(pos.row * 3 + pos.col, *cell);
        }
        assert_eq!(grid.enumerate().count(), 6);
    }

    #[test]
    fn index_mut_writes_in_place() {
        let mut grid = numbered(2, 2);
        grid[Position::new(1, 0)] = 9;
        assert_eq!(grid.iter().copied().collect::<Vec<_>>(), vec![0, 1, 9, 3]);
    }
}
