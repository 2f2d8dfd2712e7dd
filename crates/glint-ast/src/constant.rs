//! Constant values stored in constant nodes.

use std::fmt;

use ordered_float::OrderedFloat;

use crate::types::BasicType;

/// One scalar component of a constant.
///
/// Floats are wrapped in [`OrderedFloat`] so constants can be compared and
/// hashed, which lets passes match literal patterns directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Float(OrderedFloat<f32>),
    Int(i32),
    UInt(u32),
    Bool(bool),
}

impl ConstantValue {
    pub fn float(value: f32) -> Self {
        ConstantValue::Float(OrderedFloat(value))
    }

    /// The zero value of a basic type. Non-numeric kinds fall back to integer zero.
    pub fn zero(basic: BasicType) -> Self {
        match basic {
            BasicType::Float => ConstantValue::float(0.0),
            BasicType::UInt => ConstantValue::UInt(0),
            BasicType::Bool => ConstantValue::Bool(false),
            _ => ConstantValue::Int(0),
        }
    }

    pub fn basic_type(&self) -> BasicType {
        match self {
            ConstantValue::Float(_) => BasicType::Float,
            ConstantValue::Int(_) => BasicType::Int,
            ConstantValue::UInt(_) => BasicType::UInt,
            ConstantValue::Bool(_) => BasicType::Bool,
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            ConstantValue::Float(value) => value.0 == 0.0,
            ConstantValue::Int(value) => value == 0,
            ConstantValue::UInt(value) => value == 0,
            ConstantValue::Bool(value) => !value,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match *self {
            ConstantValue::Int(value) => Some(value),
            ConstantValue::UInt(value) => i32::try_from(value).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConstantValue::Float(value) if value.0.is_finite() && value.0.fract() == 0.0 => {
                write!(f, "{:.1}", value.0)
            }
            ConstantValue::Float(value) => write!(f, "{}", value.0),
            ConstantValue::Int(value) => write!(f, "{value}"),
            ConstantValue::UInt(value) => write!(f, "{value}u"),
            ConstantValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values() {
        assert_eq!(ConstantValue::zero(BasicType::Float), ConstantValue::float(0.0));
        assert_eq!(ConstantValue::zero(BasicType::Bool), ConstantValue::Bool(false));
        assert_eq!(ConstantValue::zero(BasicType::UInt), ConstantValue::UInt(0));
        assert!(ConstantValue::zero(BasicType::Int).is_zero());
        assert_eq!(ConstantValue::zero(BasicType::Int).basic_type(), BasicType::Int);
    }

    #[test]
    fn display() {
        assert_eq!(ConstantValue::float(0.0).to_string(), "0.0");
        assert_eq!(ConstantValue::float(1.5).to_string(), "1.5");
        assert_eq!(ConstantValue::UInt(3).to_string(), "3u");
        assert_eq!(ConstantValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn as_int() {
        assert_eq!(ConstantValue::Int(-2).as_int(), Some(-2));
        assert_eq!(ConstantValue::UInt(7).as_int(), Some(7));
        assert_eq!(ConstantValue::float(1.0).as_int(), None);
    }
}
