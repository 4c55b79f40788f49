//! DP row cell
//!
//! One cell of a template's DTW row: the best warping path ending at this
//! (frame, column) pair, with the frame span it covers and its accumulated
//! length-weighted cost.

/// Warping path summary for one DP cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Sentinel cost (column 0 only)
    pub score: f64,
    pub start_frame: i64,
    pub end_frame: i64,
    pub column: usize,
    /// Accumulated length-weighted cost
    pub running: f64,
    /// Accumulated motion length
    pub total: f64,
}

impl Cell {
    /// Fresh cell. Column 0 is the sentinel that lets a match begin at any
    /// frame at a fixed `start_cost`.
    pub fn new(column: usize, start_cost: f64) -> Self {
        if column == 0 {
            Self {
                score: start_cost,
                start_frame: -1,
                end_frame: -1,
                column,
                running: 0.0,
                total: 0.0,
            }
        } else {
            Self {
                score: 0.0,
                start_frame: -1,
                end_frame: -1,
                column,
                running: f64::INFINITY,
                total: f64::EPSILON,
            }
        }
    }

    /// Cost per unit of motion, comparable across paths of different lengths
    #[inline]
    pub fn normalized_cost(&self) -> f64 {
        if self.column == 0 {
            return self.score;
        }
        self.running / self.total
    }

    /// Extend `from` through this cell with one frame of `cost` weighted by
    /// the frame's motion `length`
    #[inline]
    pub fn extend(&mut self, from: &Cell, frame: i64, cost: f64, length: f64) {
        self.start_frame = from.start_frame;
        self.end_frame = frame;
        self.running = from.running + cost * length;
        self.total = from.total + length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_cost() {
        let cell = Cell::new(0, 0.3);
        assert_eq!(cell.normalized_cost(), 0.3);
        assert_eq!(cell.running, 0.0);
        assert_eq!(cell.total, 0.0);
    }

    #[test]
    fn test_unvisited_cell_is_infinite() {
        let cell = Cell::new(3, 0.3);
        assert!(cell.normalized_cost().is_infinite());
    }

    #[test]
    fn test_extend_from_sentinel() {
        let mut sentinel = Cell::new(0, 0.3);
        sentinel.start_frame = 7;

        let mut cell = Cell::new(1, 0.3);
        cell.extend(&sentinel, 7, 0.5, 2.0);

        assert_eq!(cell.start_frame, 7);
        assert_eq!(cell.end_frame, 7);
        assert!((cell.running - 1.0).abs() < 1e-12);
        assert!((cell.total - 2.0).abs() < 1e-12);
        assert!((cell.normalized_cost() - 0.5).abs() < 1e-12);
    }
}
