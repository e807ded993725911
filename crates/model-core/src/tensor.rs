// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The owned tensor type passed into and out of forward passes.

use crate::ModelError;
use std::fmt;

/// An owned, n-dimensional `f32` tensor in row-major (C) order.
///
/// Tensors are plain data: they carry no device or precision information.
/// Precision is a property of the acceleration strategy, not of the values
/// the caller feeds in.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a tensor, checking that `data` matches the element count of `shape`.
    ///
    /// # Examples
    /// ```
    /// use model_core::Tensor;
    /// let t = Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    /// assert_eq!(t.num_elements(), 4);
    /// assert!(Tensor::new(vec![2, 2], vec![1.0]).is_err());
    /// ```
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, ModelError> {
        let expected = element_count(&shape);
        if data.len() != expected {
            return Err(ModelError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Creates a zero-filled tensor.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let n = element_count(&shape);
        Self {
            shape,
            data: vec![0.0; n],
        }
    }

    /// Creates a tensor with every element set to `value`.
    pub fn full(shape: Vec<usize>, value: f32) -> Self {
        let n = element_count(&shape);
        Self {
            shape,
            data: vec![value; n],
        }
    }

    /// Creates a rank-0 tensor.
    pub fn scalar(value: f32) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// Returns the dimensions.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the total number of elements (1 for a scalar).
    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    /// Returns the elements in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the elements mutably.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor, returning its buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Applies `f` to every element, producing a tensor of the same shape.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Returns the mean of all elements, or 0.0 for an empty tensor.
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    /// Returns the index of the largest element of each row of a
    /// `[rows, cols]` tensor. A rank-1 tensor is treated as one row.
    pub fn argmax_rows(&self) -> Vec<usize> {
        let cols = self.shape.last().copied().unwrap_or(1).max(1);
        self.data
            .chunks(cols)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                        if v > best.1 {
                            (i, v)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor{:?}", self.shape)
    }
}

fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_size() {
        let t = Tensor::new(vec![2, 3], vec![0.0; 6]).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.rank(), 2);

        let err = Tensor::new(vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::ShapeMismatch { expected: 6, actual: 5, .. }
        ));
    }

    #[test]
    fn test_scalar() {
        let t = Tensor::scalar(2.5);
        assert_eq!(t.rank(), 0);
        assert_eq!(t.num_elements(), 1);
        assert_eq!(t.as_slice(), &[2.5]);
    }

    #[test]
    fn test_map_and_mean() {
        let t = Tensor::new(vec![4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let doubled = t.map(|x| x * 2.0);
        assert_eq!(doubled.as_slice(), &[2.0, 4.0, 6.0, 8.0]);
        assert!((t.mean() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_argmax_rows() {
        let t = Tensor::new(vec![2, 3], vec![0.1, 0.9, 0.0, 0.7, 0.2, 0.1]).unwrap();
        assert_eq!(t.argmax_rows(), vec![1, 0]);
    }

    #[test]
    fn test_serde_shape_survives() {
        let t = Tensor::full(vec![2, 2], 1.5);
        let json = serde_json::to_string(&t).unwrap();
        let back: Tensor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
