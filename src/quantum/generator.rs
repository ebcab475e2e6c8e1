//! Generator ("Hamiltonian") of the regime propagation
//!
//! Rows and columns follow the regime order Rising, Falling, Stagnating.
//! Hermiticity is not enforced: any 3x3 complex matrix is accepted.

use nalgebra::Matrix3;
use num_complex::Complex64;

use crate::error::{EngineError, EngineResult};

/// Default generator entries (real valued)
pub const DEFAULT_GENERATOR: [[f64; 3]; 3] = [
    [1.00, 0.10, 0.05],
    [0.10, 0.50, 0.05],
    [0.05, 0.05, 0.00],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Generator {
    matrix: Matrix3<Complex64>,
}

impl Generator {
    pub fn from_matrix(matrix: Matrix3<Complex64>) -> Self {
        Self { matrix }
    }

    /// Build from real entries, row by row
    pub fn from_real(rows: [[f64; 3]; 3]) -> Self {
        Self {
            matrix: Matrix3::from_fn(|r, c| Complex64::new(rows[r][c], 0.0)),
        }
    }

    /// Build from dynamically sized rows, rejecting anything that is not 3x3
    pub fn from_rows(rows: &[Vec<Complex64>]) -> EngineResult<Self> {
        if rows.len() != 3 {
            return Err(EngineError::GeneratorShape {
                rows: rows.len(),
                cols: rows.first().map_or(0, Vec::len),
            });
        }
        if let Some(bad) = rows.iter().find(|row| row.len() != 3) {
            return Err(EngineError::GeneratorShape {
                rows: rows.len(),
                cols: bad.len(),
            });
        }

        Ok(Self {
            matrix: Matrix3::from_fn(|r, c| rows[r][c]),
        })
    }

    pub fn matrix(&self) -> &Matrix3<Complex64> {
        &self.matrix
    }

    /// Whether `H` equals its conjugate transpose within `tolerance`
    pub fn is_hermitian(&self, tolerance: f64) -> bool {
        let diff = self.matrix - self.matrix.adjoint();
        diff.iter().all(|z| z.norm() <= tolerance)
    }

    /// Scale every entry by a real factor
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            matrix: self.matrix.map(|z| z * factor),
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::from_real(DEFAULT_GENERATOR)
    }
}
