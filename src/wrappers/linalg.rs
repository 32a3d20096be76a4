//! Linear Algebra Wrappers
//!
//! Dense `f64` matrices and vectors backed by nalgebra. Data crosses the
//! boundary in row-major order. Shape mismatches and singular systems are
//! reported as errors; nalgebra's panicking paths are never reached.

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use super::{check_output_size, WrapperError, WrapperResult};

fn shape_error(op: &str, detail: String) -> WrapperError {
    WrapperError::InvalidArg(format!("{}: {}", op, detail))
}

/// Reject a `rows x cols` shape whose storage would exceed `limit` bytes
pub fn check_shape(rows: usize, cols: usize, limit: usize) -> WrapperResult<()> {
    let bytes = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(std::mem::size_of::<f64>()))
        .ok_or_else(|| shape_error("shape", format!("{}x{} matrix is too large", rows, cols)))?;
    check_output_size("linalg", bytes, limit)
}

// =============================================================================
// Matrix
// =============================================================================

/// Dense matrix session
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    inner: DMatrix<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            inner: DMatrix::zeros(rows, cols),
        }
    }

    pub fn identity(n: usize) -> Self {
        Self {
            inner: DMatrix::identity(n, n),
        }
    }

    /// Build from row-major data of exactly `rows * cols` values
    pub fn from_row_slice(rows: usize, cols: usize, data: &[f64]) -> WrapperResult<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(shape_error(
                "from_row_slice",
                format!("{} values for a {}x{} matrix", data.len(), rows, cols),
            ));
        }
        Ok(Self {
            inner: DMatrix::from_row_slice(rows, cols, data),
        })
    }

    pub fn rows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn cols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.inner.get((row, col)).copied()
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> WrapperResult<()> {
        let (rows, cols) = self.inner.shape();
        let slot = self.inner.get_mut((row, col)).ok_or_else(|| {
            shape_error(
                "set",
                format!("({}, {}) is outside {}x{}", row, col, rows, cols),
            )
        })?;
        *slot = value;
        Ok(())
    }

    /// Overwrite entries in row-major order with as many values as fit;
    /// returns how many were taken
    pub fn set_from_slice(&mut self, data: &[f64]) -> usize {
        let cols = self.cols();
        let count = data.len().min(self.rows() * cols);
        for (i, &value) in data[..count].iter().enumerate() {
            self.inner[(i / cols, i % cols)] = value;
        }
        count
    }

    /// Entries in row-major order
    pub fn to_row_vec(&self) -> Vec<f64> {
        (0..self.rows())
            .flat_map(|r| (0..self.cols()).map(move |c| self.inner[(r, c)]))
            .collect()
    }

    pub fn multiply(&self, other: &Matrix) -> WrapperResult<Matrix> {
        if self.cols() != other.rows() {
            return Err(shape_error(
                "multiply",
                format!(
                    "{}x{} by {}x{}",
                    self.rows(),
                    self.cols(),
                    other.rows(),
                    other.cols()
                ),
            ));
        }
        Ok(Self {
            inner: &self.inner * &other.inner,
        })
    }

    fn check_same_shape(&self, op: &str, other: &Matrix) -> WrapperResult<()> {
        if self.inner.shape() != other.inner.shape() {
            return Err(shape_error(
                op,
                format!(
                    "{}x{} and {}x{}",
                    self.rows(),
                    self.cols(),
                    other.rows(),
                    other.cols()
                ),
            ));
        }
        Ok(())
    }

    pub fn add(&self, other: &Matrix) -> WrapperResult<Matrix> {
        self.check_same_shape("add", other)?;
        Ok(Self {
            inner: &self.inner + &other.inner,
        })
    }

    pub fn subtract(&self, other: &Matrix) -> WrapperResult<Matrix> {
        self.check_same_shape("subtract", other)?;
        Ok(Self {
            inner: &self.inner - &other.inner,
        })
    }

    pub fn transpose(&self) -> Matrix {
        Self {
            inner: self.inner.transpose(),
        }
    }

    fn check_square(&self, op: &str) -> WrapperResult<()> {
        if !self.inner.is_square() || self.rows() == 0 {
            return Err(shape_error(
                op,
                format!("needs a non-empty square matrix, got {}x{}", self.rows(), self.cols()),
            ));
        }
        Ok(())
    }

    pub fn inverse(&self) -> WrapperResult<Matrix> {
        self.check_square("inverse")?;
        self.inner
            .clone()
            .try_inverse()
            .map(|inner| Self { inner })
            .ok_or_else(|| WrapperError::invalid("linalg", "matrix is singular"))
    }

    pub fn determinant(&self) -> WrapperResult<f64> {
        self.check_square("determinant")?;
        Ok(self.inner.determinant())
    }

    /// Frobenius norm
    pub fn norm(&self) -> f64 {
        self.inner.norm()
    }

    pub fn scale(&mut self, factor: f64) {
        self.inner *= factor;
    }

    /// Ones on the diagonal, zeros elsewhere (non-square shapes allowed)
    pub fn set_identity(&mut self) {
        self.inner.fill_with_identity();
    }

    /// Fill with uniform values in `[-1, 1]`
    pub fn set_random(&mut self) {
        self.set_random_with(&mut rand::thread_rng());
    }

    pub fn set_random_with<R: Rng>(&mut self, rng: &mut R) {
        for value in self.inner.iter_mut() {
            *value = rng.gen_range(-1.0..=1.0);
        }
    }

    /// Eigenvalues of a symmetric matrix, ascending
    pub fn symmetric_eigenvalues(&self) -> WrapperResult<Vec<f64>> {
        self.check_square("symmetric_eigenvalues")?;
        let mut values: Vec<f64> = self
            .inner
            .clone()
            .symmetric_eigen()
            .eigenvalues
            .iter()
            .copied()
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        Ok(values)
    }

    /// Solve `self * x = b`
    pub fn solve(&self, b: &[f64]) -> WrapperResult<Vec<f64>> {
        self.check_square("solve")?;
        if b.len() != self.rows() {
            return Err(shape_error(
                "solve",
                format!("right-hand side has {} values, expected {}", b.len(), self.rows()),
            ));
        }
        let rhs = DVector::from_column_slice(b);
        self.inner
            .clone()
            .lu()
            .solve(&rhs)
            .map(|x| x.iter().copied().collect())
            .ok_or_else(|| WrapperError::invalid("linalg", "matrix is singular"))
    }
}

// =============================================================================
// Vector
// =============================================================================

/// Dense vector
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    inner: DVector<f64>,
}

impl Vector {
    pub fn zeros(len: usize) -> Self {
        Self {
            inner: DVector::zeros(len),
        }
    }

    pub fn from_slice(data: &[f64]) -> Self {
        Self {
            inner: DVector::from_column_slice(data),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.inner.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: f64) -> WrapperResult<()> {
        let len = self.len();
        let slot = self.inner.get_mut(index).ok_or_else(|| {
            shape_error("set", format!("index {} is outside length {}", index, len))
        })?;
        *slot = value;
        Ok(())
    }

    pub fn as_slice(&self) -> &[f64] {
        self.inner.as_slice()
    }

    pub fn dot(&self, other: &Vector) -> WrapperResult<f64> {
        if self.len() != other.len() {
            return Err(shape_error(
                "dot",
                format!("lengths {} and {}", self.len(), other.len()),
            ));
        }
        Ok(self.inner.dot(&other.inner))
    }

    pub fn norm(&self) -> f64 {
        self.inner.norm()
    }

    /// Scale to unit length; the zero vector is left unchanged
    pub fn normalize(&mut self) {
        let norm = self.inner.norm();
        if norm > 0.0 {
            self.inner /= norm;
        }
    }

    /// Cross product of the first three components
    pub fn cross3(&self, other: &Vector) -> WrapperResult<Vector> {
        if self.len() != 3 || other.len() != 3 {
            return Err(shape_error(
                "cross3",
                format!("needs two 3-vectors, got lengths {} and {}", self.len(), other.len()),
            ));
        }
        let a = nalgebra::Vector3::new(self.inner[0], self.inner[1], self.inner[2]);
        let b = nalgebra::Vector3::new(other.inner[0], other.inner[1], other.inner[2]);
        Ok(Self::from_slice(a.cross(&b).as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_row_major_layout() {
        let m = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.get(0, 2), Some(3.0));
        assert_eq!(m.get(1, 0), Some(4.0));
        assert_eq!(m.to_row_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(Matrix::from_row_slice(2, 2, &[1.0]).is_err());
    }

    #[test]
    fn test_set_and_bounds() {
        let mut m = Matrix::zeros(2, 2);
        m.set(1, 1, 9.0).unwrap();
        assert_eq!(m.get(1, 1), Some(9.0));
        assert!(m.set(2, 0, 1.0).is_err());
        assert_eq!(m.get(5, 5), None);

        assert_eq!(m.set_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]), 4);
        assert_eq!(m.to_row_vec(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.set_from_slice(&[7.0]), 1);
        assert_eq!(m.get(0, 0), Some(7.0));
        assert_eq!(m.get(0, 1), Some(2.0));
    }

    #[test]
    fn test_arithmetic() {
        let a = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Matrix::from_row_slice(2, 2, &[5.0, 6.0, 7.0, 8.0]).unwrap();
        assert_eq!(a.multiply(&b).unwrap().to_row_vec(), vec![19.0, 22.0, 43.0, 50.0]);
        assert_eq!(a.add(&b).unwrap().to_row_vec(), vec![6.0, 8.0, 10.0, 12.0]);
        assert_eq!(b.subtract(&a).unwrap().to_row_vec(), vec![4.0; 4]);
        assert_eq!(a.transpose().to_row_vec(), vec![1.0, 3.0, 2.0, 4.0]);

        let wide = Matrix::zeros(2, 3);
        assert!(wide.multiply(&a).is_err());
        assert!(a.add(&wide).is_err());
    }

    #[test]
    fn test_inverse_and_determinant() {
        let a = Matrix::from_row_slice(2, 2, &[4.0, 7.0, 2.0, 6.0]).unwrap();
        assert!(approx(a.determinant().unwrap(), 10.0));
        let product = a.multiply(&a.inverse().unwrap()).unwrap();
        for (got, want) in product.to_row_vec().iter().zip([1.0, 0.0, 0.0, 1.0]) {
            assert!(approx(*got, want));
        }

        let singular = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]).unwrap();
        assert!(singular.inverse().is_err());
        assert!(Matrix::zeros(2, 3).determinant().is_err());
    }

    #[test]
    fn test_solve() {
        let a = Matrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]).unwrap();
        let x = a.solve(&[3.0, 5.0]).unwrap();
        assert!(approx(x[0], 0.8));
        assert!(approx(x[1], 1.4));
        assert!(a.solve(&[1.0]).is_err());
    }

    #[test]
    fn test_symmetric_eigenvalues_sorted() {
        let a = Matrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]).unwrap();
        let values = a.symmetric_eigenvalues().unwrap();
        assert!(approx(values[0], 1.0));
        assert!(approx(values[1], 3.0));
    }

    #[test]
    fn test_identity_scale_norm_random() {
        let mut m = Matrix::zeros(3, 3);
        m.set_identity();
        assert_eq!(m, Matrix::identity(3));
        m.scale(2.0);
        assert!(approx(m.norm(), (12.0f64).sqrt()));

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        m.set_random_with(&mut rng);
        assert!(m.to_row_vec().iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_vectors() {
        let a = Vector::from_slice(&[1.0, 0.0, 0.0]);
        let b = Vector::from_slice(&[0.0, 1.0, 0.0]);
        assert_eq!(a.dot(&b).unwrap(), 0.0);
        assert_eq!(a.cross3(&b).unwrap().as_slice(), &[0.0, 0.0, 1.0]);
        assert!(a.dot(&Vector::zeros(2)).is_err());
        assert!(Vector::zeros(2).cross3(&a).is_err());

        let mut v = Vector::from_slice(&[3.0, 4.0]);
        assert_eq!(v.norm(), 5.0);
        v.normalize();
        assert!(approx(v.get(0).unwrap(), 0.6));
        v.set(1, 2.0).unwrap();
        assert!(v.set(2, 0.0).is_err());

        let mut zero = Vector::zeros(3);
        zero.normalize();
        assert_eq!(zero.as_slice(), &[0.0, 0.0, 0.0]);
    }
}
