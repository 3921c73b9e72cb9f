//! Log mappings produced by the step functions
//!
//! Every loss and metric output lands in a [`Logs`] mapping under a unique,
//! human-readable key. Values are scalars for reduced losses and metrics, or
//! 1-D arrays for unreduced (per-sample) outputs. Keys keep insertion order,
//! which is the traversal order of the loss/metric trees.

use indexmap::IndexMap;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single logged value: scalar or per-sample vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LogValue {
    Scalar(f32),
    Vector(Array1<f32>),
}

impl LogValue {
    /// Scalar view of the value, if it is one.
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            LogValue::Scalar(v) => Some(*v),
            LogValue::Vector(_) => None,
        }
    }

    /// A zero shaped like `self`.
    pub fn zero_like(&self) -> LogValue {
        match self {
            LogValue::Scalar(_) => LogValue::Scalar(0.0),
            LogValue::Vector(v) => LogValue::Vector(Array1::zeros(v.len())),
        }
    }

    /// Elementwise sum with `other`; shapes must agree.
    pub fn add(&self, other: &LogValue) -> Result<LogValue> {
        match (self, other) {
            (LogValue::Scalar(a), LogValue::Scalar(b)) => Ok(LogValue::Scalar(a + b)),
            (LogValue::Vector(a), LogValue::Vector(b)) if a.len() == b.len() => {
                Ok(LogValue::Vector(a + b))
            }
            _ => Err(Error::shape_mismatch(self.describe(), other.describe())),
        }
    }

    /// Elementwise division by a scalar.
    pub fn div(&self, divisor: f32) -> LogValue {
        match self {
            LogValue::Scalar(v) => LogValue::Scalar(v / divisor),
            LogValue::Vector(v) => LogValue::Vector(v / divisor),
        }
    }

    fn describe(&self) -> String {
        match self {
            LogValue::Scalar(_) => "scalar".to_string(),
            LogValue::Vector(v) => format!("vector[{}]", v.len()),
        }
    }
}

impl From<f32> for LogValue {
    fn from(v: f32) -> Self {
        LogValue::Scalar(v)
    }
}

/// Mapping from unique log key to value, in traversal order.
pub type Logs = IndexMap<String, LogValue>;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_scalar_arithmetic() {
        let a = LogValue::Scalar(1.0);
        let b = LogValue::Scalar(2.0);
        assert_eq!(a.add(&b).unwrap(), LogValue::Scalar(3.0));
        assert_eq!(a.div(2.0), LogValue::Scalar(0.5));
    }

    #[test]
    fn test_vector_arithmetic() {
        let a = LogValue::Vector(arr1(&[1.0, 2.0]));
        let b = LogValue::Vector(arr1(&[3.0, 4.0]));
        assert_eq!(a.add(&b).unwrap(), LogValue::Vector(arr1(&[4.0, 6.0])));
    }

    #[test]
    fn test_mixed_shapes_rejected() {
        let a = LogValue::Scalar(1.0);
        let b = LogValue::Vector(arr1(&[1.0]));
        assert!(a.add(&b).is_err());

        let c = LogValue::Vector(arr1(&[1.0, 2.0]));
        let d = LogValue::Vector(arr1(&[1.0]));
        assert!(c.add(&d).is_err());
    }

    #[test]
    fn test_zero_like() {
        let v = LogValue::Vector(arr1(&[1.0, 2.0]));
        assert_eq!(v.zero_like(), LogValue::Vector(arr1(&[0.0, 0.0])));
        assert_eq!(LogValue::Scalar(7.0).zero_like(), LogValue::Scalar(0.0));
    }
}
