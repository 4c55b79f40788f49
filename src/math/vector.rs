//! Fixed-Size Numeric Vectors
//!
//! Every frame, keypoint, direction and feature in the recognizer is a
//! `Vector`. The dimensionality is fixed per instance and set by the
//! device producing the stream (2 for a mouse, 3 for a tracked joint,
//! 6 or 8 for paired controllers).
//!
//! Arithmetic operators (`+`, `-`, `*`, `/`, unary `-`) return new vectors.
//! `normalize`, `minimum` and `maximum` mutate in place.
//!
//! Operators panic on mismatched dimensions. Entry points that accept
//! caller data check dimensions first with [`Vector::ensure_same_size`] and
//! report [`crate::Error::DimensionMismatch`] instead.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Index, IndexMut, Mul, Neg, Sub};

/// Ordered sequence of real components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector {
    data: Vec<f64>,
}

impl Vector {
    /// Create a vector from its components
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    /// Create a vector of `size` components all equal to `value`
    pub fn constant(value: f64, size: usize) -> Self {
        Self {
            data: vec![value; size],
        }
    }

    /// Create a zero vector
    pub fn zeros(size: usize) -> Self {
        Self::constant(0.0, size)
    }

    /// Linear interpolation `(1 - t) * a + t * b`.
    ///
    /// # Panics
    /// Panics if `a` and `b` differ in size.
    pub fn lerp(a: &Vector, b: &Vector, t: f64) -> Self {
        assert_same_size(a, b);
        Self {
            data: a
                .data
                .iter()
                .zip(&b.data)
                .map(|(x, y)| (1.0 - t) * x + t * y)
                .collect(),
        }
    }

    /// Number of components
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Components as a slice
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Check that `other` has the same dimensionality
    pub fn ensure_same_size(&self, other: &Vector) -> crate::Result<()> {
        if self.size() != other.size() {
            return Err(crate::Error::DimensionMismatch {
                expected: self.size(),
                found: other.size(),
            });
        }
        Ok(())
    }

    /// Set every component to `value`
    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|c| *c = value);
    }

    /// Dot product
    #[inline]
    pub fn dot(&self, other: &Vector) -> f64 {
        assert_same_size(self, other);
        self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum()
    }

    /// Squared Euclidean length (no square root on the hot path)
    #[inline]
    pub fn l2_norm_squared(&self) -> f64 {
        self.data.iter().map(|c| c * c).sum()
    }

    /// Euclidean length
    #[inline]
    pub fn l2_norm(&self) -> f64 {
        self.l2_norm_squared().sqrt()
    }

    /// Squared Euclidean distance to `other`
    #[inline]
    pub fn distance_squared(&self, other: &Vector) -> f64 {
        assert_same_size(self, other);
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| {
                let d = a - b;
                d * d
            })
            .sum()
    }

    /// Euclidean distance to `other`
    #[inline]
    pub fn distance(&self, other: &Vector) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Sum of components
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Scale to unit length in place.
    ///
    /// A zero-length vector is left unchanged so that degenerate motion never
    /// turns into NaN components.
    pub fn normalize(&mut self) -> &mut Self {
        let length = self.l2_norm();
        if length > 0.0 {
            self.data.iter_mut().for_each(|c| *c /= length);
        }
        self
    }

    /// Unit-length copy
    pub fn normalized(&self) -> Self {
        let mut ret = self.clone();
        ret.normalize();
        ret
    }

    /// Store the component-wise minimum of `self` and `other` in place
    pub fn minimum(&mut self, other: &Vector) {
        assert_same_size(self, other);
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            if *b < *a {
                *a = *b;
            }
        }
    }

    /// Store the component-wise maximum of `self` and `other` in place
    pub fn maximum(&mut self, other: &Vector) {
        assert_same_size(self, other);
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            if *b > *a {
                *a = *b;
            }
        }
    }

    /// Component-wise absolute value
    pub fn abs(&self) -> Self {
        Self {
            data: self.data.iter().map(|c| c.abs()).collect(),
        }
    }

    /// True when every component is exactly zero
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|c| *c == 0.0)
    }

    /// Iterate over components
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.data.iter()
    }
}

impl From<Vec<f64>> for Vector {
    fn from(data: Vec<f64>) -> Self {
        Self::new(data)
    }
}

impl From<&[f64]> for Vector {
    fn from(data: &[f64]) -> Self {
        Self::new(data.to_vec())
    }
}

impl Index<usize> for Vector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.data[index]
    }
}

impl IndexMut<usize> for Vector {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.data[index]
    }
}

#[inline]
fn assert_same_size(a: &Vector, b: &Vector) {
    assert!(
        a.size() == b.size(),
        "vector dimension mismatch: {} vs {}",
        a.size(),
        b.size()
    );
}

fn zip_with(a: &Vector, b: &Vector, f: impl Fn(f64, f64) -> f64) -> Vector {
    assert_same_size(a, b);
    Vector {
        data: a.data.iter().zip(&b.data).map(|(x, y)| f(*x, *y)).collect(),
    }
}

impl Add<&Vector> for &Vector {
    type Output = Vector;

    fn add(self, rhs: &Vector) -> Vector {
        zip_with(self, rhs, |a, b| a + b)
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        &self + &rhs
    }
}

impl Sub<&Vector> for &Vector {
    type Output = Vector;

    fn sub(self, rhs: &Vector) -> Vector {
        zip_with(self, rhs, |a, b| a - b)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, rhs: Vector) -> Vector {
        &self - &rhs
    }
}

impl Mul<f64> for &Vector {
    type Output = Vector;

    fn mul(self, rhs: f64) -> Vector {
        Vector {
            data: self.data.iter().map(|c| c * rhs).collect(),
        }
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, rhs: f64) -> Vector {
        &self * rhs
    }
}

impl Div<f64> for &Vector {
    type Output = Vector;

    fn div(self, rhs: f64) -> Vector {
        Vector {
            data: self.data.iter().map(|c| c / rhs).collect(),
        }
    }
}

impl Div<f64> for Vector {
    type Output = Vector;

    fn div(self, rhs: f64) -> Vector {
        &self / rhs
    }
}

/// Component-wise division
impl Div<&Vector> for &Vector {
    type Output = Vector;

    fn div(self, rhs: &Vector) -> Vector {
        zip_with(self, rhs, |a, b| a / b)
    }
}

impl Neg for &Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        Vector {
            data: self.data.iter().map(|c| -c).collect(),
        }
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        -&self
    }
}
