use serde::{Deserialize, Serialize};

use crate::error::{ImageTraceError, Result};

/// N×N pairwise similarity scores produced by a completed analysis.
///
/// The matrix is immutable once built. Only the upper triangle is read by
/// consumers; the diagonal carries no meaning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct SimilarityMatrix {
    rows: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    /// Build a matrix, rejecting ragged rows and non-finite scores
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(ImageTraceError::InvalidMatrix(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(ImageTraceError::InvalidMatrix(format!(
                    "score at ({}, {}) is not finite",
                    i, j
                )));
            }
        }
        Ok(Self { rows })
    }

    /// Build a symmetric matrix of dimension `n` from upper-triangle pairs.
    /// Unlisted pairs score 0.0 and the diagonal is 1.0.
    pub fn from_pairs(n: usize, pairs: &[((usize, usize), f64)]) -> Result<Self> {
        let mut rows = vec![vec![0.0; n]; n];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        for &((i, j), score) in pairs {
            if i >= n || j >= n {
                return Err(ImageTraceError::InvalidMatrix(format!(
                    "pair ({}, {}) out of bounds for dimension {}",
                    i, j, n
                )));
            }
            rows[i][j] = score;
            rows[j][i] = score;
        }
        Self::from_rows(rows)
    }

    pub fn dimension(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn score(&self, i: usize, j: usize) -> Option<f64> {
        self.rows.get(i).and_then(|row| row.get(j)).copied()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

impl TryFrom<Vec<Vec<f64>>> for SimilarityMatrix {
    type Error = ImageTraceError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl From<SimilarityMatrix> for Vec<Vec<f64>> {
    fn from(matrix: SimilarityMatrix) -> Self {
        matrix.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_ragged_rows() {
        let err = SimilarityMatrix::from_rows(vec![vec![1.0, 0.5], vec![0.5]]).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_rejects_nan() {
        assert!(SimilarityMatrix::from_rows(vec![vec![f64::NAN]]).is_err());
    }

    #[test]
    fn test_from_pairs_is_symmetric() {
        let m = SimilarityMatrix::from_pairs(3, &[((0, 2), 0.4)]).unwrap();
        assert_eq!(m.dimension(), 3);
        assert_eq!(m.score(0, 2), Some(0.4));
        assert_eq!(m.score(2, 0), Some(0.4));
        assert_eq!(m.score(1, 1), Some(1.0));
        assert_eq!(m.score(3, 0), None);
    }

    #[test]
    fn test_from_pairs_out_of_bounds() {
        assert!(SimilarityMatrix::from_pairs(2, &[((0, 2), 0.4)]).is_err());
    }

    #[test]
    fn test_deserialize_validates_shape() {
        let m: SimilarityMatrix = serde_json::from_str("[[1.0,0.2],[0.2,1.0]]").unwrap();
        assert_eq!(m.dimension(), 2);
        assert!(serde_json::from_str::<SimilarityMatrix>("[[1.0,0.2],[0.2]]").is_err());

        let empty: SimilarityMatrix = serde_json::from_str("[]").unwrap();
        assert!(empty.is_empty());
    }
}
