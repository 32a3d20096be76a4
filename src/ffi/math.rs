//! Math Exports
//!
//! Dense `f64` matrices are sessions behind handles; vector helpers and the
//! `mathc_*` 3D functions work on caller-owned arrays. Scalar-returning
//! functions report errors as NaN, array-writing ones as 0 (1 on success),
//! handle-returning ones as handle 0.

use parking_lot::Mutex;

use super::{guard, host_array, host_out, host_values};
use crate::config;
use crate::runtime::{Handle, HandleTable};
use crate::wrappers::linalg::{check_shape, Matrix, Vector};
use crate::wrappers::math3d;
use crate::wrappers::{WrapperError, WrapperResult};

lazy_static::lazy_static! {
    static ref MATRICES: Mutex<HandleTable<Matrix>> = Mutex::new(HandleTable::new("matrix"));
}

fn not_found(handle: Handle) -> WrapperError {
    WrapperError::HandleNotFound(handle.into())
}

fn shape_arg(rows: usize, cols: usize) -> WrapperResult<()> {
    check_shape(rows, cols, config::active().limits.max_output_bytes)
}

/// Copy `values` into a caller array of `capacity`, returning the count
unsafe fn write_values(dst: *mut f64, capacity: usize, values: &[f64]) -> WrapperResult<i64> {
    let written = host_out(dst, capacity)?.write_all(values)?;
    Ok(written as i64)
}

/// Write a fixed-size result and report success
unsafe fn put<const N: usize>(out: *mut f32, values: &[f32; N]) -> WrapperResult<i32> {
    host_out(out, N)?.write_all(values)?;
    Ok(1)
}

// ========== Matrix sessions ==========

/// New `rows x cols` zero matrix; handle 0 when its storage would exceed
/// `limits.max_output_bytes`
#[no_mangle]
pub extern "C" fn matrix_create(rows: u32, cols: u32) -> Handle {
    guard("matrix_create", 0, || {
        shape_arg(rows as usize, cols as usize)?;
        Ok(MATRICES.lock().insert(Matrix::zeros(rows as usize, cols as usize)))
    })
}

/// New matrix from `rows * cols` row-major values
///
/// # Safety
///
/// `data` must be valid for `rows * cols` reads.
#[no_mangle]
pub unsafe extern "C" fn matrix_from_data(data: *const f64, rows: u32, cols: u32) -> Handle {
    guard("matrix_from_data", 0, || {
        shape_arg(rows as usize, cols as usize)?;
        let count = rows as usize * cols as usize;
        let matrix = Matrix::from_row_slice(rows as usize, cols as usize, host_values(data, count)?)?;
        Ok(MATRICES.lock().insert(matrix))
    })
}

/// Element at `(row, col)`, NaN when out of range or the handle is unknown
#[no_mangle]
pub extern "C" fn matrix_get(handle: Handle, row: u32, col: u32) -> f64 {
    guard("matrix_get", f64::NAN, || {
        MATRICES
            .lock()
            .get(handle)
            .ok_or_else(|| not_found(handle))?
            .get(row as usize, col as usize)
            .ok_or_else(|| WrapperError::InvalidArg(format!("index ({}, {}) out of range", row, col)))
    })
}

/// Set the element at `(row, col)`; 1 on success, 0 on error
#[no_mangle]
pub extern "C" fn matrix_set(handle: Handle, row: u32, col: u32, value: f64) -> i32 {
    guard("matrix_set", 0, || {
        MATRICES
            .lock()
            .get_mut(handle)
            .ok_or_else(|| not_found(handle))?
            .set(row as usize, col as usize, value)?;
        Ok(1)
    })
}

/// Row count, -1 for an unknown handle
#[no_mangle]
pub extern "C" fn matrix_rows(handle: Handle) -> i64 {
    guard("matrix_rows", -1, || {
        MATRICES.lock().with(handle, |m| m.rows() as i64).ok_or_else(|| not_found(handle))
    })
}

/// Column count, -1 for an unknown handle
#[no_mangle]
pub extern "C" fn matrix_cols(handle: Handle) -> i64 {
    guard("matrix_cols", -1, || {
        MATRICES.lock().with(handle, |m| m.cols() as i64).ok_or_else(|| not_found(handle))
    })
}

/// Copy the matrix row-major into `dst`. Returns the values written, -1 on
/// error (nothing is written when `capacity` is too small).
///
/// # Safety
///
/// `dst` must be valid for `capacity` writes.
#[no_mangle]
pub unsafe extern "C" fn matrix_to_data(handle: Handle, dst: *mut f64, capacity: usize) -> i64 {
    guard("matrix_to_data", -1, || {
        let values = MATRICES
            .lock()
            .with(handle, Matrix::to_row_vec)
            .ok_or_else(|| not_found(handle))?;
        write_values(dst, capacity, &values)
    })
}

macro_rules! matrix_binary {
    ($export:ident, $method:ident) => {
        /// New matrix from a binary operation; handle 0 on dimension mismatch
        /// or an unknown operand
        #[no_mangle]
        pub extern "C" fn $export(a: Handle, b: Handle) -> Handle {
            guard(stringify!($export), 0, || {
                let mut table = MATRICES.lock();
                let lhs = table.get(a).ok_or_else(|| not_found(a))?;
                let rhs = table.get(b).ok_or_else(|| not_found(b))?;
                shape_arg(lhs.rows(), rhs.cols())?;
                let result = lhs.$method(rhs)?;
                Ok(table.insert(result))
            })
        }
    };
}

matrix_binary!(matrix_multiply, multiply);
matrix_binary!(matrix_add, add);
matrix_binary!(matrix_subtract, subtract);

/// New transposed copy
#[no_mangle]
pub extern "C" fn matrix_transpose(handle: Handle) -> Handle {
    guard("matrix_transpose", 0, || {
        let mut table = MATRICES.lock();
        let result = table.get(handle).ok_or_else(|| not_found(handle))?.transpose();
        Ok(table.insert(result))
    })
}

/// New inverse; handle 0 for singular or non-square matrices
#[no_mangle]
pub extern "C" fn matrix_inverse(handle: Handle) -> Handle {
    guard("matrix_inverse", 0, || {
        let mut table = MATRICES.lock();
        let result = table.get(handle).ok_or_else(|| not_found(handle))?.inverse()?;
        Ok(table.insert(result))
    })
}

/// Determinant, NaN for non-square matrices
#[no_mangle]
pub extern "C" fn matrix_determinant(handle: Handle) -> f64 {
    guard("matrix_determinant", f64::NAN, || {
        MATRICES.lock().get(handle).ok_or_else(|| not_found(handle))?.determinant()
    })
}

/// Frobenius norm
#[no_mangle]
pub extern "C" fn matrix_norm(handle: Handle) -> f64 {
    guard("matrix_norm", f64::NAN, || {
        MATRICES.lock().with(handle, Matrix::norm).ok_or_else(|| not_found(handle))
    })
}

/// Multiply every element by `factor` in place
#[no_mangle]
pub extern "C" fn matrix_scale(handle: Handle, factor: f64) -> i32 {
    guard("matrix_scale", 0, || {
        MATRICES
            .lock()
            .with_mut(handle, |m| m.scale(factor))
            .ok_or_else(|| not_found(handle))?;
        Ok(1)
    })
}

/// Overwrite with the identity (ones on the main diagonal)
#[no_mangle]
pub extern "C" fn matrix_set_identity(handle: Handle) -> i32 {
    guard("matrix_set_identity", 0, || {
        MATRICES
            .lock()
            .with_mut(handle, Matrix::set_identity)
            .ok_or_else(|| not_found(handle))?;
        Ok(1)
    })
}

/// Overwrite with uniform values in [-1, 1]
#[no_mangle]
pub extern "C" fn matrix_set_random(handle: Handle) -> i32 {
    guard("matrix_set_random", 0, || {
        MATRICES
            .lock()
            .with_mut(handle, Matrix::set_random)
            .ok_or_else(|| not_found(handle))?;
        Ok(1)
    })
}

/// Eigenvalues of a symmetric matrix, ascending, into `dst`. Returns the
/// count written or -1.
///
/// # Safety
///
/// `dst` must be valid for `capacity` writes.
#[no_mangle]
pub unsafe extern "C" fn matrix_eigenvalues(handle: Handle, dst: *mut f64, capacity: usize) -> i64 {
    guard("matrix_eigenvalues", -1, || {
        let values = MATRICES
            .lock()
            .get(handle)
            .ok_or_else(|| not_found(handle))?
            .symmetric_eigenvalues()?;
        write_values(dst, capacity, &values)
    })
}

/// Solve `A x = b` for `x` into `dst`. Returns the count written or -1.
///
/// # Safety
///
/// `b` must be valid for `n` reads and `dst` for `capacity` writes.
#[no_mangle]
pub unsafe extern "C" fn matrix_solve(handle: Handle, b: *const f64, n: usize, dst: *mut f64, capacity: usize) -> i64 {
    guard("matrix_solve", -1, || {
        let rhs = host_values(b, n)?;
        let x = MATRICES
            .lock()
            .get(handle)
            .ok_or_else(|| not_found(handle))?
            .solve(rhs)?;
        write_values(dst, capacity, &x)
    })
}

/// Destroy a matrix. 1 when it existed, 0 otherwise.
#[no_mangle]
pub extern "C" fn matrix_destroy(handle: Handle) -> i32 {
    guard("matrix_destroy", 0, || Ok(MATRICES.lock().remove(handle).is_some() as i32))
}

// ========== Vectors ==========

/// Dot product of two `n`-vectors
///
/// # Safety
///
/// `a` and `b` must be valid for `n` reads.
#[no_mangle]
pub unsafe extern "C" fn vector_dot(a: *const f64, b: *const f64, n: usize) -> f64 {
    guard("vector_dot", f64::NAN, || {
        Vector::from_slice(host_values(a, n)?).dot(&Vector::from_slice(host_values(b, n)?))
    })
}

/// Euclidean norm of an `n`-vector
///
/// # Safety
///
/// `a` must be valid for `n` reads.
#[no_mangle]
pub unsafe extern "C" fn vector_norm(a: *const f64, n: usize) -> f64 {
    guard("vector_norm", f64::NAN, || Ok(Vector::from_slice(host_values(a, n)?).norm()))
}

/// Unit vector of `src` into `dst` (a zero vector is copied unchanged)
///
/// # Safety
///
/// `src` must be valid for `n` reads and `dst` for `n` writes.
#[no_mangle]
pub unsafe extern "C" fn vector_normalize(src: *const f64, n: usize, dst: *mut f64) -> i32 {
    guard("vector_normalize", 0, || {
        let mut v = Vector::from_slice(host_values(src, n)?);
        v.normalize();
        write_values(dst, n, v.as_slice())?;
        Ok(1)
    })
}

/// Cross product of two 3-vectors into `dst`
///
/// # Safety
///
/// `a` and `b` must be valid for 3 reads and `dst` for 3 writes.
#[no_mangle]
pub unsafe extern "C" fn vector_cross3(a: *const f64, b: *const f64, dst: *mut f64) -> i32 {
    guard("vector_cross3", 0, || {
        let a = Vector::from_slice(host_values(a, 3)?);
        let b = Vector::from_slice(host_values(b, 3)?);
        write_values(dst, 3, a.cross3(&b)?.as_slice())?;
        Ok(1)
    })
}

// ========== mathc: scalars ==========

#[no_mangle]
pub extern "C" fn mathc_to_radians(degrees: f32) -> f32 {
    math3d::to_radians(degrees)
}

#[no_mangle]
pub extern "C" fn mathc_to_degrees(radians: f32) -> f32 {
    math3d::to_degrees(radians)
}

#[no_mangle]
pub extern "C" fn mathc_lerp(a: f32, b: f32, t: f32) -> f32 {
    math3d::lerp(a, b, t)
}

#[no_mangle]
pub extern "C" fn mathc_clamp(value: f32, min: f32, max: f32) -> f32 {
    math3d::clamp(value, min, max)
}

// ========== mathc: vec3 ==========

macro_rules! array_binary {
    ($export:ident, $op:path, $n:literal) => {
        /// `out = op(a, b)`; 1 on success, 0 on a null or misaligned pointer
        ///
        /// # Safety
        ///
        /// `a` and `b` must be valid for reads and `out` for writes of their
        /// fixed sizes.
        #[no_mangle]
        pub unsafe extern "C" fn $export(a: *const f32, b: *const f32, out: *mut f32) -> i32 {
            guard(stringify!($export), 0, || {
                put(out, &$op(&host_array::<$n>(a)?, &host_array::<$n>(b)?))
            })
        }
    };
}

array_binary!(mathc_vec3_add, math3d::vec3_add, 3);
array_binary!(mathc_vec3_subtract, math3d::vec3_subtract, 3);
array_binary!(mathc_vec3_multiply, math3d::vec3_multiply, 3);
array_binary!(mathc_vec3_cross, math3d::vec3_cross, 3);
array_binary!(mathc_mat4_multiply, math3d::mat4_multiply, 16);
array_binary!(mathc_quat_multiply, math3d::quat_multiply, 4);

/// # Safety
///
/// `a` must be valid for 3 reads and `out` for 3 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_vec3_scale(a: *const f32, s: f32, out: *mut f32) -> i32 {
    guard("mathc_vec3_scale", 0, || put(out, &math3d::vec3_scale(&host_array(a)?, s)))
}

/// Dot product, NaN on a bad pointer
///
/// # Safety
///
/// `a` and `b` must be valid for 3 reads.
#[no_mangle]
pub unsafe extern "C" fn mathc_vec3_dot(a: *const f32, b: *const f32) -> f32 {
    guard("mathc_vec3_dot", f32::NAN, || {
        Ok(math3d::vec3_dot(&host_array(a)?, &host_array(b)?))
    })
}

/// Length, NaN on a bad pointer
///
/// # Safety
///
/// `a` must be valid for 3 reads.
#[no_mangle]
pub unsafe extern "C" fn mathc_vec3_length(a: *const f32) -> f32 {
    guard("mathc_vec3_length", f32::NAN, || Ok(math3d::vec3_length(&host_array(a)?)))
}

/// # Safety
///
/// `a` must be valid for 3 reads and `out` for 3 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_vec3_normalize(a: *const f32, out: *mut f32) -> i32 {
    guard("mathc_vec3_normalize", 0, || put(out, &math3d::vec3_normalize(&host_array(a)?)))
}

/// # Safety
///
/// `a` and `b` must be valid for 3 reads and `out` for 3 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_vec3_lerp(a: *const f32, b: *const f32, t: f32, out: *mut f32) -> i32 {
    guard("mathc_vec3_lerp", 0, || {
        put(out, &math3d::vec3_lerp(&host_array(a)?, &host_array(b)?, t))
    })
}

// ========== mathc: mat4 (column-major) ==========

/// # Safety
///
/// `out` must be valid for 16 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_mat4_identity(out: *mut f32) -> i32 {
    guard("mathc_mat4_identity", 0, || put(out, &math3d::mat4_identity()))
}

/// 0 for a singular matrix (`out` untouched)
///
/// # Safety
///
/// `m` must be valid for 16 reads and `out` for 16 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_mat4_inverse(m: *const f32, out: *mut f32) -> i32 {
    guard("mathc_mat4_inverse", 0, || put(out, &math3d::mat4_inverse(&host_array(m)?)?))
}

/// # Safety
///
/// `m` must be valid for 16 reads and `out` for 16 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_mat4_transpose(m: *const f32, out: *mut f32) -> i32 {
    guard("mathc_mat4_transpose", 0, || put(out, &math3d::mat4_transpose(&host_array(m)?)))
}

/// `out = m * translation(v)`
///
/// # Safety
///
/// `m` must be valid for 16 reads, `v` for 3 reads and `out` for 16 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_mat4_translate(m: *const f32, v: *const f32, out: *mut f32) -> i32 {
    guard("mathc_mat4_translate", 0, || {
        put(out, &math3d::mat4_translate(&host_array(m)?, &host_array(v)?))
    })
}

/// `out = m * scaling(v)`
///
/// # Safety
///
/// `m` must be valid for 16 reads, `v` for 3 reads and `out` for 16 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_mat4_scale(m: *const f32, v: *const f32, out: *mut f32) -> i32 {
    guard("mathc_mat4_scale", 0, || {
        put(out, &math3d::mat4_scale(&host_array(m)?, &host_array(v)?))
    })
}

macro_rules! mat4_rotation {
    ($export:ident, $op:path) => {
        /// `out = m * rotation(radians)`
        ///
        /// # Safety
        ///
        /// `m` must be valid for 16 reads and `out` for 16 writes.
        #[no_mangle]
        pub unsafe extern "C" fn $export(m: *const f32, radians: f32, out: *mut f32) -> i32 {
            guard(stringify!($export), 0, || put(out, &$op(&host_array(m)?, radians)))
        }
    };
}

mat4_rotation!(mathc_mat4_rotate_x, math3d::mat4_rotate_x);
mat4_rotation!(mathc_mat4_rotate_y, math3d::mat4_rotate_y);
mat4_rotation!(mathc_mat4_rotate_z, math3d::mat4_rotate_z);

/// Right-handed OpenGL perspective projection
///
/// # Safety
///
/// `out` must be valid for 16 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_mat4_perspective(fov_y: f32, aspect: f32, near: f32, far: f32, out: *mut f32) -> i32 {
    guard("mathc_mat4_perspective", 0, || {
        put(out, &math3d::mat4_perspective(fov_y, aspect, near, far)?)
    })
}

/// Right-handed OpenGL orthographic projection
///
/// # Safety
///
/// `out` must be valid for 16 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_mat4_ortho(
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
    out: *mut f32,
) -> i32 {
    guard("mathc_mat4_ortho", 0, || {
        put(out, &math3d::mat4_ortho(left, right, bottom, top, near, far)?)
    })
}

/// Right-handed view matrix
///
/// # Safety
///
/// `eye`, `target` and `up` must be valid for 3 reads and `out` for 16
/// writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_mat4_look_at(eye: *const f32, target: *const f32, up: *const f32, out: *mut f32) -> i32 {
    guard("mathc_mat4_look_at", 0, || {
        put(out, &math3d::mat4_look_at(&host_array(eye)?, &host_array(target)?, &host_array(up)?)?)
    })
}

// ========== mathc: quaternions ([x, y, z, w]) ==========

/// # Safety
///
/// `out` must be valid for 4 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_quat_identity(out: *mut f32) -> i32 {
    guard("mathc_quat_identity", 0, || put(out, &math3d::quat_identity()))
}

/// 0 for a zero quaternion
///
/// # Safety
///
/// `q` must be valid for 4 reads and `out` for 4 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_quat_normalize(q: *const f32, out: *mut f32) -> i32 {
    guard("mathc_quat_normalize", 0, || put(out, &math3d::quat_normalize(&host_array(q)?)?))
}

/// # Safety
///
/// `axis` must be valid for 3 reads and `out` for 4 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_quat_from_axis_angle(axis: *const f32, radians: f32, out: *mut f32) -> i32 {
    guard("mathc_quat_from_axis_angle", 0, || {
        put(out, &math3d::quat_from_axis_angle(&host_array(axis)?, radians)?)
    })
}

/// # Safety
///
/// `a` and `b` must be valid for 4 reads and `out` for 4 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_quat_slerp(a: *const f32, b: *const f32, t: f32, out: *mut f32) -> i32 {
    guard("mathc_quat_slerp", 0, || {
        put(out, &math3d::quat_slerp(&host_array(a)?, &host_array(b)?, t)?)
    })
}

/// Rotation matrix of a quaternion
///
/// # Safety
///
/// `q` must be valid for 4 reads and `out` for 16 writes.
#[no_mangle]
pub unsafe extern "C" fn mathc_quat_to_mat4(q: *const f32, out: *mut f32) -> i32 {
    guard("mathc_quat_to_mat4", 0, || put(out, &math3d::quat_to_mat4(&host_array(q)?)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_session() {
        let data = [4.0, 1.0, 2.0, 3.0];
        let a = unsafe { matrix_from_data(data.as_ptr(), 2, 2) };
        assert_ne!(a, 0);
        assert_eq!(matrix_rows(a), 2);
        assert_eq!(matrix_get(a, 1, 0), 2.0);
        assert!((matrix_determinant(a) - 10.0).abs() < 1e-12);

        let inv = matrix_inverse(a);
        let product = matrix_multiply(a, inv);
        let mut out = [0.0f64; 4];
        assert_eq!(unsafe { matrix_to_data(product, out.as_mut_ptr(), out.len()) }, 4);
        for (got, want) in out.iter().zip([1.0, 0.0, 0.0, 1.0]) {
            assert!((got - want).abs() < 1e-12);
        }

        let b = [9.0, 13.0];
        let mut x = [0.0f64; 2];
        assert_eq!(unsafe { matrix_solve(a, b.as_ptr(), 2, x.as_mut_ptr(), 2) }, 2);
        assert!((x[0] - 1.4).abs() < 1e-12);
        assert!((x[1] - 3.4).abs() < 1e-12);

        for h in [a, inv, product] {
            assert_eq!(matrix_destroy(h), 1);
        }
        assert!(matrix_get(a, 0, 0).is_nan());
        assert_eq!(matrix_destroy(a), 0);
    }

    #[test]
    fn test_matrix_errors_are_sentinels() {
        let a = matrix_create(2, 3);
        let b = matrix_create(2, 3);
        assert_eq!(matrix_multiply(a, b), 0);
        assert_eq!(matrix_inverse(a), 0);
        assert!(matrix_determinant(a).is_nan());
        assert!(matrix_get(a, 5, 5).is_nan());
        assert_eq!(matrix_set(a, 5, 5, 1.0), 0);

        let mut small = [0.0f64; 2];
        assert_eq!(unsafe { matrix_to_data(a, small.as_mut_ptr(), small.len()) }, -1);
        matrix_destroy(a);
        matrix_destroy(b);
    }

    #[test]
    fn test_oversized_matrices_are_refused() {
        assert_eq!(matrix_create(1 << 20, 1 << 20), 0);
        assert!(crate::ffi::last_error().unwrap().starts_with("matrix_create: "));
        assert_eq!(matrix_create(u32::MAX, u32::MAX), 0);

        let column = matrix_create(1 << 16, 1);
        let row = matrix_create(1, 1 << 16);
        assert_ne!(column, 0);
        assert_ne!(row, 0);
        assert_eq!(matrix_multiply(column, row), 0);
        assert!(crate::ffi::last_error().unwrap().contains("exceeds limit"));
        matrix_destroy(column);
        matrix_destroy(row);
    }

    #[test]
    fn test_vector_helpers() {
        let a = [3.0, 4.0, 0.0];
        let b = [0.0, 0.0, 1.0];
        assert_eq!(unsafe { vector_dot(a.as_ptr(), b.as_ptr(), 3) }, 0.0);
        assert_eq!(unsafe { vector_norm(a.as_ptr(), 3) }, 5.0);

        let mut unit = [0.0f64; 3];
        assert_eq!(unsafe { vector_normalize(a.as_ptr(), 3, unit.as_mut_ptr()) }, 1);
        assert!((unit[0] - 0.6).abs() < 1e-12);

        let mut cross = [0.0f64; 3];
        assert_eq!(unsafe { vector_cross3(a.as_ptr(), b.as_ptr(), cross.as_mut_ptr()) }, 1);
        assert_eq!(cross, [4.0, -3.0, 0.0]);
    }

    #[test]
    fn test_mathc_arrays() {
        let a = [1.0f32, 2.0, 3.0];
        let b = [4.0f32, 5.0, 6.0];
        let mut out = [0.0f32; 3];
        assert_eq!(unsafe { mathc_vec3_add(a.as_ptr(), b.as_ptr(), out.as_mut_ptr()) }, 1);
        assert_eq!(out, [5.0, 7.0, 9.0]);
        assert_eq!(unsafe { mathc_vec3_dot(a.as_ptr(), b.as_ptr()) }, 32.0);

        let mut m = [0.0f32; 16];
        assert_eq!(unsafe { mathc_mat4_identity(m.as_mut_ptr()) }, 1);
        let mut t = [0.0f32; 16];
        assert_eq!(unsafe { mathc_mat4_translate(m.as_ptr(), a.as_ptr(), t.as_mut_ptr()) }, 1);
        assert_eq!(&t[12..15], &[1.0, 2.0, 3.0]);

        let zero = [0.0f32; 16];
        let mut untouched = [7.0f32; 16];
        assert_eq!(unsafe { mathc_mat4_inverse(zero.as_ptr(), untouched.as_mut_ptr()) }, 0);
        assert!(untouched.iter().all(|&v| v == 7.0));

        assert_eq!(unsafe { mathc_vec3_add(std::ptr::null(), b.as_ptr(), out.as_mut_ptr()) }, 0);
        assert!((mathc_to_degrees(mathc_to_radians(90.0)) - 90.0).abs() < 1e-4);
    }
}
