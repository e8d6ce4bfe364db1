use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// 2D vector for world positions, velocities and headings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians, +x axis = 0)
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Vec2::new(cos, sin)
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length_sq().sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.dot(*self)
    }

    /// Unit vector, or ZERO for a zero-length input
    pub fn normalize(&self) -> Self {
        self.normalize_with_length().0
    }

    /// Unit vector plus the input length; `(ZERO, 0.0)` for a zero vector
    pub fn normalize_with_length(&self) -> (Self, f32) {
        match self.length() {
            len if len > 0.0 => (Vec2::new(self.x / len, self.y / len), len),
            _ => (Self::ZERO, 0.0),
        }
    }

    #[inline]
    pub fn dot(&self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn distance_to(&self, other: Vec2) -> f32 {
        (*self - other).length()
    }

    #[inline]
    pub fn distance_sq_to(&self, other: Vec2) -> f32 {
        (*self - other).length_sq()
    }

    pub fn lerp(&self, other: Vec2, t: f32) -> Self {
        *self + (other - *self) * t
    }

    /// Quarter turn towards +y
    pub fn perpendicular(&self) -> Self {
        Vec2::new(-self.y, self.x)
    }

    /// Heading in radians, `atan2(y, x)`
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Component-wise clamp into the box `[min, max]`
    pub fn clamp(&self, min: Vec2, max: Vec2) -> Self {
        Vec2::new(self.x.clamp(min.x, max.x), self.y.clamp(min.y, max.y))
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn approx_eq(&self, other: Vec2, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

/// Wrap an angle difference into `(-PI, PI]` so easing takes the short way round.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

macro_rules! componentwise {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl $trait for Vec2 {
            type Output = Self;
            #[inline]
            fn $method(self, rhs: Self) -> Self {
                Vec2::new(self.x $op rhs.x, self.y $op rhs.y)
            }
        }

        impl $assign_trait for Vec2 {
            #[inline]
            fn $assign_method(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }
    };
}

componentwise!(Add, add, AddAssign, add_assign, +);
componentwise!(Sub, sub, SubAssign, sub_assign, -);

impl Mul<f32> for Vec2 {
    type Output = Self;
    #[inline]
    fn mul(self, k: f32) -> Self {
        Vec2::new(self.x * k, self.y * k)
    }
}

impl MulAssign<f32> for Vec2 {
    #[inline]
    fn mul_assign(&mut self, k: f32) {
        *self = *self * k;
    }
}

impl Neg for Vec2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Vec2::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_length() {
        let v = Vec2::new(3.0, 4.0);
        assert!(approx_eq(v.length(), 5.0));
        assert!(approx_eq(v.length_sq(), 25.0));
    }

    #[test]
    fn test_normalize_zero() {
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
        assert_eq!(Vec2::ZERO.normalize_with_length(), (Vec2::ZERO, 0.0));
    }

    #[test]
    fn test_normalize() {
        let (n, len) = Vec2::new(3.0, 4.0).normalize_with_length();
        assert!(approx_eq(len, 5.0));
        assert!(approx_eq(n.x, 0.6));
        assert!(approx_eq(n.y, 0.8));
    }

    #[test]
    fn test_from_angle_and_back() {
        let v = Vec2::from_angle(PI / 2.0);
        assert!(approx_eq(v.x, 0.0));
        assert!(approx_eq(v.y, 1.0));
        assert!(approx_eq(v.angle(), PI / 2.0));
    }

    #[test]
    fn test_perpendicular() {
        let v = Vec2::new(1.0, 0.0);
        let p = v.perpendicular();
        assert!(approx_eq(v.dot(p), 0.0));
        assert_eq!(p, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_clamp_box() {
        let v = Vec2::new(-5.0, 30.0).clamp(Vec2::ZERO, Vec2::new(20.0, 20.0));
        assert_eq!(v, Vec2::new(0.0, 20.0));
    }

    #[test]
    fn test_lerp() {
        let mid = Vec2::ZERO.lerp(Vec2::new(10.0, 10.0), 0.2);
        assert!(mid.approx_eq(Vec2::new(2.0, 2.0), EPSILON));
    }

    #[test]
    fn test_ops() {
        let mut a = Vec2::new(1.0, 2.0);
        a += Vec2::new(3.0, 4.0);
        assert_eq!(a, Vec2::new(4.0, 6.0));
        a -= Vec2::new(1.0, 1.0);
        a *= 2.0;
        assert_eq!(a, Vec2::new(6.0, 10.0));
        assert_eq!(-a * 0.5, Vec2::new(-3.0, -5.0));
    }

    #[test]
    fn test_wrap_angle_range() {
        assert!(approx_eq(wrap_angle(0.0), 0.0));
        assert!(approx_eq(wrap_angle(PI), PI));
        assert!(approx_eq(wrap_angle(-PI), PI));
        assert!(approx_eq(wrap_angle(3.0 * PI / 2.0), -PI / 2.0));
        assert!(approx_eq(wrap_angle(-3.0 * PI / 2.0), PI / 2.0));
        for i in -40..40 {
            let w = wrap_angle(i as f32 * 0.37);
            assert!(w > -PI && w <= PI + EPSILON, "{} out of range", w);
        }
    }

    #[test]
    fn test_serde() {
        let v = Vec2::new(1.5, 2.5);
        let encoded =
            bincode::serde::encode_to_vec(v, bincode::config::standard()).unwrap();
        let (decoded, _): (Vec2, usize) =
            bincode::serde::decode_from_slice(&encoded, bincode::config::standard()).unwrap();
        assert_eq!(v, decoded);
    }
}
