//! Graded truth values and their reduction to crisp pass/fail.

use ordered_float::OrderedFloat;
use std::fmt;

/// Graded success of a body execution, clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuzzyValue(OrderedFloat<f64>);

impl FuzzyValue {
    pub const TRUE: FuzzyValue = FuzzyValue(OrderedFloat(1.0));
    pub const FALSE: FuzzyValue = FuzzyValue(OrderedFloat(0.0));

    /// NaN is read as zero.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::FALSE;
        }
        FuzzyValue(OrderedFloat(value.clamp(0.0, 1.0)))
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }

    pub fn get(self) -> f64 {
        self.0 .0
    }
}

impl From<bool> for FuzzyValue {
    fn from(value: bool) -> Self {
        FuzzyValue::from_bool(value)
    }
}

impl fmt::Display for FuzzyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Turns a graded value into a crisp decision.
pub trait Defuzzify: Send + Sync {
    fn defuzzify(&self, value: FuzzyValue) -> bool;
}

/// Succeeds when the value reaches `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub threshold: f64,
}

impl Default for Threshold {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Defuzzify for Threshold {
    fn defuzzify(&self, value: FuzzyValue) -> bool {
        value.get() >= self.threshold
    }
}
