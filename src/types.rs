//! The wire value vocabulary: every argument and reply crosses the
//! connection as a [`Value`] tagged with a [`Type`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Nil,
    Bool,
    Int,
    Float,
    String,
    Record,
}

impl Type {
    fn name(&self) -> &'static str {
        use Type::*;
        match self {
            Nil => "Nil",
            Bool => "Bool",
            Int => "Int",
            Float => "Float",
            String => "String",
            Record => "Record",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Record(BTreeMap<String, Value>),
}

impl Value {
    pub fn wire_type(&self) -> Type {
        match self {
            Value::Nil => Type::Nil,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::String(_) => Type::String,
            Value::Record(_) => Type::Record,
        }
    }

    /// Permissive conversion, used only as the last resort of argument
    /// extraction. Numeric values convert between each other and any scalar
    /// renders to a string; everything else is a [`TypeMismatch`].
    pub fn coerce(self, target: Type) -> Result<Value, TypeMismatch> {
        if self.wire_type() == target {
            return Ok(self);
        }
        match (self, target) {
            (Value::Int(n), Type::Float) => Ok(Value::Float(n as f64)),
            (Value::Float(x), Type::Int) => Ok(Value::Int(x as i64)),
            (Value::Bool(b), Type::String) => Ok(Value::String(b.to_string())),
            (Value::Int(n), Type::String) => Ok(Value::String(n.to_string())),
            (Value::Float(x), Type::String) => Ok(Value::String(x.to_string())),
            (value, target) => Err(TypeMismatch::new(value, target)),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Value {
        Value::Nil
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_owned())
    }
}

/// Types with a fixed wire representation.
pub trait Typed {
    fn wire_type() -> Type;
}

pub trait Encode {
    fn encode(self) -> Value;
}

pub trait Decode: Sized {
    fn decode(value: Value) -> Result<Self, TypeMismatch>;
}

macro_rules! impl_codec {
    ($rust_type:ty, $wire_type:expr, $encode_name:pat => $encode_expr:expr, $($decode_arm:tt)*) => {
        impl Typed for $rust_type {
            fn wire_type() -> Type {
                $wire_type
            }
        }

        impl Encode for $rust_type {
            fn encode(self) -> Value {
                let $encode_name = self;
                $encode_expr
            }
        }

        impl Decode for $rust_type {
            fn decode(value: Value) -> Result<Self, TypeMismatch> {
                Ok(match value {
                    $($decode_arm)*,
                    other => return Err(TypeMismatch::new(other, <Self as Typed>::wire_type())),
                })
            }
        }
    };
}

impl_codec!((), Type::Nil, () => Value::Nil, Value::Nil => ());
impl_codec!(bool, Type::Bool, b => Value::Bool(b), Value::Bool(b) => b);
impl_codec!(i64, Type::Int, n => Value::Int(n), Value::Int(n) => n);
impl_codec!(f64, Type::Float, x => Value::Float(x), Value::Float(x) => x);
impl_codec!(String, Type::String, s => Value::String(s), Value::String(s) => s);
impl_codec!(BTreeMap<String, Value>, Type::Record, m => Value::Record(m), Value::Record(m) => m);

impl Encode for &str {
    fn encode(self) -> Value {
        Value::String(self.to_owned())
    }
}

#[derive(Debug, Clone, Error)]
#[error("type error: {value:?} :/: {expected}")]
pub struct TypeMismatch {
    value: Value,
    expected: Type,
}

impl TypeMismatch {
    pub fn new(value: Value, expected: Type) -> Self {
        Self { value, expected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_keeps_matching_types() {
        assert_eq!(Value::Int(3).coerce(Type::Int).unwrap(), Value::Int(3));
    }

    #[test]
    fn coerce_widens_and_stringifies() {
        assert_eq!(Value::Int(3).coerce(Type::Float).unwrap(), Value::Float(3.0));
        assert_eq!(Value::Float(2.5).coerce(Type::Int).unwrap(), Value::Int(2));
        assert_eq!(
            Value::Int(7).coerce(Type::String).unwrap(),
            Value::String("7".to_owned())
        );
    }

    #[test]
    fn coerce_rejects_the_rest() {
        assert!(Value::String("x".to_owned()).coerce(Type::Int).is_err());
        assert!(Value::Nil.coerce(Type::Bool).is_err());
    }

    #[test]
    fn decode_reports_expected_type() {
        let err = i64::decode(Value::String("nope".to_owned())).unwrap_err();
        assert!(err.to_string().contains("Int"));
    }
}
