//! 3D Math Wrappers
//!
//! Vector, matrix and quaternion helpers over plain `f32` arrays, computed
//! with glam. Matrices are column-major `[f32; 16]`; quaternions are
//! `[x, y, z, w]`. Projection helpers follow the right-handed OpenGL
//! convention (clip-space depth in `[-1, 1]`).

use glam::{Mat4, Quat, Vec3};

use super::{WrapperError, WrapperResult};

pub type Vec3Array = [f32; 3];
pub type Mat4Array = [f32; 16];
pub type QuatArray = [f32; 4];

// =============================================================================
// Scalars
// =============================================================================

pub fn to_radians(degrees: f32) -> f32 {
    degrees.to_radians()
}

pub fn to_degrees(radians: f32) -> f32 {
    radians.to_degrees()
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamp without panicking when `min > max` (the result is then `min`)
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.min(max).max(min)
}

// =============================================================================
// vec3
// =============================================================================

fn v3(a: &Vec3Array) -> Vec3 {
    Vec3::from_array(*a)
}

pub fn vec3_add(a: &Vec3Array, b: &Vec3Array) -> Vec3Array {
    (v3(a) + v3(b)).to_array()
}

pub fn vec3_subtract(a: &Vec3Array, b: &Vec3Array) -> Vec3Array {
    (v3(a) - v3(b)).to_array()
}

/// Component-wise product
pub fn vec3_multiply(a: &Vec3Array, b: &Vec3Array) -> Vec3Array {
    (v3(a) * v3(b)).to_array()
}

pub fn vec3_scale(a: &Vec3Array, s: f32) -> Vec3Array {
    (v3(a) * s).to_array()
}

pub fn vec3_dot(a: &Vec3Array, b: &Vec3Array) -> f32 {
    v3(a).dot(v3(b))
}

pub fn vec3_cross(a: &Vec3Array, b: &Vec3Array) -> Vec3Array {
    v3(a).cross(v3(b)).to_array()
}

pub fn vec3_length(a: &Vec3Array) -> f32 {
    v3(a).length()
}

/// Unit vector; the zero vector stays zero
pub fn vec3_normalize(a: &Vec3Array) -> Vec3Array {
    v3(a).normalize_or_zero().to_array()
}

pub fn vec3_lerp(a: &Vec3Array, b: &Vec3Array, t: f32) -> Vec3Array {
    v3(a).lerp(v3(b), t).to_array()
}

// =============================================================================
// mat4
// =============================================================================

fn m4(m: &Mat4Array) -> Mat4 {
    Mat4::from_cols_array(m)
}

pub fn mat4_identity() -> Mat4Array {
    Mat4::IDENTITY.to_cols_array()
}

/// `a * b`
pub fn mat4_multiply(a: &Mat4Array, b: &Mat4Array) -> Mat4Array {
    (m4(a) * m4(b)).to_cols_array()
}

/// Inverse; singular matrices are rejected
pub fn mat4_inverse(m: &Mat4Array) -> WrapperResult<Mat4Array> {
    let m = m4(m);
    let det = m.determinant();
    if !det.is_finite() || det.abs() <= f32::EPSILON {
        return Err(WrapperError::invalid("math3d", "matrix is singular"));
    }
    Ok(m.inverse().to_cols_array())
}

pub fn mat4_transpose(m: &Mat4Array) -> Mat4Array {
    m4(m).transpose().to_cols_array()
}

/// `m * T(v)`
pub fn mat4_translate(m: &Mat4Array, v: &Vec3Array) -> Mat4Array {
    (m4(m) * Mat4::from_translation(v3(v))).to_cols_array()
}

/// `m * S(v)`
pub fn mat4_scale(m: &Mat4Array, v: &Vec3Array) -> Mat4Array {
    (m4(m) * Mat4::from_scale(v3(v))).to_cols_array()
}

pub fn mat4_rotate_x(m: &Mat4Array, radians: f32) -> Mat4Array {
    (m4(m) * Mat4::from_rotation_x(radians)).to_cols_array()
}

pub fn mat4_rotate_y(m: &Mat4Array, radians: f32) -> Mat4Array {
    (m4(m) * Mat4::from_rotation_y(radians)).to_cols_array()
}

pub fn mat4_rotate_z(m: &Mat4Array, radians: f32) -> Mat4Array {
    (m4(m) * Mat4::from_rotation_z(radians)).to_cols_array()
}

pub fn mat4_perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> WrapperResult<Mat4Array> {
    if !(fov_y > 0.0 && aspect > 0.0 && near > 0.0 && far > near) {
        return Err(WrapperError::InvalidArg(format!(
            "perspective needs fov_y > 0, aspect > 0, 0 < near < far (got {}, {}, {}, {})",
            fov_y, aspect, near, far
        )));
    }
    Ok(Mat4::perspective_rh_gl(fov_y, aspect, near, far).to_cols_array())
}

pub fn mat4_ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> WrapperResult<Mat4Array> {
    if left == right || bottom == top || near == far {
        return Err(WrapperError::InvalidArg(
            "orthographic volume has zero extent".to_string(),
        ));
    }
    Ok(Mat4::orthographic_rh_gl(left, right, bottom, top, near, far).to_cols_array())
}

pub fn mat4_look_at(eye: &Vec3Array, target: &Vec3Array, up: &Vec3Array) -> WrapperResult<Mat4Array> {
    let forward = v3(target) - v3(eye);
    if forward.length_squared() == 0.0 || forward.cross(v3(up)).length_squared() == 0.0 {
        return Err(WrapperError::InvalidArg(
            "look_at needs distinct eye/target and an up vector not parallel to the view"
                .to_string(),
        ));
    }
    Ok(Mat4::look_at_rh(v3(eye), v3(target), v3(up)).to_cols_array())
}

// =============================================================================
// quaternions
// =============================================================================

fn q(a: &QuatArray) -> Quat {
    Quat::from_array(*a)
}

pub fn quat_identity() -> QuatArray {
    Quat::IDENTITY.to_array()
}

/// `a * b` (apply `b`, then `a`)
pub fn quat_multiply(a: &QuatArray, b: &QuatArray) -> QuatArray {
    (q(a) * q(b)).to_array()
}

pub fn quat_normalize(a: &QuatArray) -> WrapperResult<QuatArray> {
    let quat = q(a);
    if quat.length_squared() == 0.0 {
        return Err(WrapperError::InvalidArg("cannot normalize a zero quaternion".to_string()));
    }
    Ok(quat.normalize().to_array())
}

pub fn quat_from_axis_angle(axis: &Vec3Array, radians: f32) -> WrapperResult<QuatArray> {
    let axis = v3(axis).normalize_or_zero();
    if axis == Vec3::ZERO {
        return Err(WrapperError::InvalidArg("rotation axis must be non-zero".to_string()));
    }
    Ok(Quat::from_axis_angle(axis, radians).to_array())
}

/// Spherical interpolation between two unit quaternions
pub fn quat_slerp(a: &QuatArray, b: &QuatArray, t: f32) -> WrapperResult<QuatArray> {
    let a = quat_normalize(a)?;
    let b = quat_normalize(b)?;
    Ok(q(&a).slerp(q(&b), t).to_array())
}

/// Rotation matrix of a quaternion (normalized first)
pub fn quat_to_mat4(a: &QuatArray) -> WrapperResult<Mat4Array> {
    let unit = quat_normalize(a)?;
    Ok(Mat4::from_quat(q(&unit)).to_cols_array())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn test_vec3_ops() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert_eq!(vec3_add(&a, &b), [5.0, 7.0, 9.0]);
        assert_eq!(vec3_subtract(&b, &a), [3.0, 3.0, 3.0]);
        assert_eq!(vec3_multiply(&a, &b), [4.0, 10.0, 18.0]);
        assert_eq!(vec3_scale(&a, 2.0), [2.0, 4.0, 6.0]);
        assert_eq!(vec3_dot(&a, &b), 32.0);
        assert_eq!(vec3_cross(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_eq!(vec3_length(&[3.0, 4.0, 0.0]), 5.0);
        assert_eq!(vec3_normalize(&[0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
        assert_eq!(vec3_lerp(&a, &b, 0.5), [2.5, 3.5, 4.5]);
    }

    #[test]
    fn test_scalars() {
        assert!((to_radians(180.0) - std::f32::consts::PI).abs() < 1e-6);
        assert!((to_degrees(FRAC_PI_2) - 90.0).abs() < 1e-4);
        assert_eq!(lerp(0.0, 10.0, 0.25), 2.5);
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 1.0, 0.0), 1.0);
    }

    #[test]
    fn test_matrix_layout_is_column_major() {
        let t = mat4_translate(&mat4_identity(), &[1.0, 2.0, 3.0]);
        assert_eq!(&t[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(mat4_transpose(&t)[3], 1.0);
    }

    #[test]
    fn test_inverse() {
        let m = mat4_scale(&mat4_translate(&mat4_identity(), &[1.0, -2.0, 3.0]), &[2.0, 2.0, 2.0]);
        let product = mat4_multiply(&m, &mat4_inverse(&m).unwrap());
        assert!(close(&product, &mat4_identity()));
        assert!(mat4_inverse(&[0.0; 16]).is_err());
    }

    #[test]
    fn test_rotation_matches_quaternion() {
        let from_matrix = mat4_rotate_z(&mat4_identity(), FRAC_PI_2);
        let quat = quat_from_axis_angle(&[0.0, 0.0, 1.0], FRAC_PI_2).unwrap();
        assert!(close(&from_matrix, &quat_to_mat4(&quat).unwrap()));
        assert!(quat_from_axis_angle(&[0.0, 0.0, 0.0], 1.0).is_err());

        let rx = mat4_rotate_x(&mat4_identity(), FRAC_PI_2);
        let ry = mat4_rotate_y(&mat4_identity(), FRAC_PI_2);
        assert!(!close(&rx, &ry));
    }

    #[test]
    fn test_quaternion_ops() {
        let id = quat_identity();
        let qz = quat_from_axis_angle(&[0.0, 0.0, 1.0], 1.0).unwrap();
        assert!(close(&quat_multiply(&id, &qz), &qz));
        assert!(close(&quat_slerp(&id, &qz, 0.0).unwrap(), &id));
        assert!(close(&quat_slerp(&id, &qz, 1.0).unwrap(), &qz));
        assert!(close(&quat_normalize(&[0.0, 0.0, 0.0, 2.0]).unwrap(), &id));
        assert!(quat_normalize(&[0.0; 4]).is_err());
    }

    #[test]
    fn test_projections() {
        let p = mat4_perspective(FRAC_PI_2, 1.0, 0.1, 100.0).unwrap();
        assert!((p[0] - 1.0).abs() < 1e-5);
        assert_eq!(p[11], -1.0);
        assert!(mat4_perspective(FRAC_PI_2, 1.0, 1.0, 0.5).is_err());

        let o = mat4_ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        assert_eq!(o[0], 1.0);
        assert!(mat4_ortho(0.0, 0.0, -1.0, 1.0, 0.1, 1.0).is_err());

        let view = mat4_look_at(&[0.0, 0.0, 5.0], &[0.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!((view[14] + 5.0).abs() < 1e-5);
        assert!(mat4_look_at(&[0.0; 3], &[0.0; 3], &[0.0, 1.0, 0.0]).is_err());
    }
}
