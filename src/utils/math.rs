//! Математические функции и утилиты

use libm::{atan2f, cosf, sinf, sqrtf};
use nalgebra::Quaternion;

use crate::data::Vector3;

/// Квадратный корень с защитой от отрицательных значений
#[inline]
pub fn safe_sqrt(value: f32) -> f32 {
    if value <= 0.0 {
        0.0
    } else {
        sqrtf(value)
    }
}

/// Нормализация вектора; нулевой вектор возвращается без изменений
#[inline]
pub fn normalize_or_zero(v: &Vector3) -> Vector3 {
    let length = safe_sqrt(v.x * v.x + v.y * v.y + v.z * v.z);
    if length < f32::EPSILON {
        *v
    } else {
        v / length
    }
}

/// Крен и тангаж по вектору гравитации (рыскание = 0)
pub fn accel_to_euler(accel: &Vector3) -> Vector3 {
    let a = normalize_or_zero(accel);

    let roll = atan2f(a.y, a.z);
    let pitch = -atan2f(a.x, sqrtf(a.y * a.y + a.z * a.z));

    Vector3::new(roll, pitch, 0.0)
}

/// Ориентация по акселерометру и магнитометру без гироскопа.
///
/// Крен и тангаж берутся из [`accel_to_euler`], магнитный вектор поворачивается
/// в горизонтальную плоскость, курс = `-atan2(my, mx)`.
pub fn pose_from_accel_mag(accel: &Vector3, mag: &Vector3) -> Vector3 {
    let mut pose = accel_to_euler(accel);

    // рыскание нулевое, поэтому кватернион собирается только из крена и тангажа
    let (sx2, cx2) = (sinf(pose.x / 2.0), cosf(pose.x / 2.0));
    let (sy2, cy2) = (sinf(pose.y / 2.0), cosf(pose.y / 2.0));
    let q = Quaternion::new(cx2 * cy2, sx2 * cy2, cx2 * sy2, -sx2 * sy2);

    let m = Quaternion::from_imag(*mag);
    let rotated = (q * m * q.conjugate()).imag();

    pose.z = -atan2f(rotated.y, rotated.x);
    pose
}
