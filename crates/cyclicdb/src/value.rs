//! The twelve-variant value union stored in each record field.

use crate::error::Error;

/// Storable data type code.
///
/// Numeric values match the on-disk type codes used by the file format:
/// `-1` is reserved for "unspecified" and has no [`Value`] counterpart, `0`
/// is `Void` (a schema slot with no storable payload, not to be confused
/// with a null `Value`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum DataType {
    Void = 0,
    Bool = 1,
    I8 = 2,
    U8 = 3,
    I16 = 4,
    U16 = 5,
    I32 = 6,
    U32 = 7,
    I64 = 8,
    U64 = 9,
    F32 = 10,
    F64 = 11,
}

impl DataType {
    /// The on-disk/API type code for this type.
    pub fn code(self) -> i16 {
        self as i16
    }

    /// Resolve a type code read from a field descriptor or API call.
    pub fn from_code(code: i16) -> Option<Self> {
        Some(match code {
            0 => DataType::Void,
            1 => DataType::Bool,
            2 => DataType::I8,
            3 => DataType::U8,
            4 => DataType::I16,
            5 => DataType::U16,
            6 => DataType::I32,
            7 => DataType::U32,
            8 => DataType::I64,
            9 => DataType::U64,
            10 => DataType::F32,
            11 => DataType::F64,
            _ => return None,
        })
    }

    /// Number of bytes this type occupies in a record's field payload.
    pub fn byte_size(self) -> usize {
        match self {
            DataType::Void => 0,
            DataType::Bool | DataType::I8 | DataType::U8 => 1,
            DataType::I16 | DataType::U16 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 => 4,
            DataType::I64 | DataType::U64 | DataType::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Void => "void",
            DataType::Bool => "bool",
            DataType::I8 => "i8",
            DataType::U8 => "u8",
            DataType::I16 => "i16",
            DataType::U16 => "u16",
            DataType::I32 => "i32",
            DataType::U32 => "u32",
            DataType::I64 => "i64",
            DataType::U64 => "u64",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
        }
    }
}

/// A field's stored value, or the absence of one.
///
/// `Null` carries no payload and is distinct from every typed variant, even
/// a zero-valued one: a field's presence bitmap bit is what distinguishes
/// "stored zero" from "absent", and `Value::Null` is how the in-memory model
/// represents an absent field once materialised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// The data type of the stored variant, or `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => DataType::Bool,
            Value::I8(_) => DataType::I8,
            Value::U8(_) => DataType::U8,
            Value::I16(_) => DataType::I16,
            Value::U16(_) => DataType::U16,
            Value::I32(_) => DataType::I32,
            Value::U32(_) => DataType::U32,
            Value::I64(_) => DataType::I64,
            Value::U64(_) => DataType::U64,
            Value::F32(_) => DataType::F32,
            Value::F64(_) => DataType::F64,
        })
    }

    pub fn has_value(&self) -> bool {
        !matches!(self, Value::Null)
    }

    /// Permissive read: cast the stored value to `T`, the way a C-style
    /// numeric cast would. Fails with [`Error::NoValue`] if this value is
    /// `Null`.
    pub fn get<T: Permissive>(&self) -> Result<T, Error> {
        T::from_value_permissive(self)
    }

    /// Strict read: succeed only if the stored variant is exactly `T`.
    /// Fails with [`Error::TypeMismatch`] on any other variant (including
    /// `Null`, reported as stored type `"null"`).
    pub fn get_strict<T: Strict>(&self) -> Result<T, Error> {
        T::from_value_strict(self)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// Permissive (cast-based) conversion from a stored [`Value`] to `Self`.
pub trait Permissive: Sized {
    fn from_value_permissive(value: &Value) -> Result<Self, Error>;
}

/// Strict (exact-variant) conversion from a stored [`Value`] to `Self`.
pub trait Strict: Sized {
    fn from_value_strict(value: &Value) -> Result<Self, Error>;
}

impl Permissive for bool {
    fn from_value_permissive(value: &Value) -> Result<Self, Error> {
        Ok(match value {
            Value::Null => return Err(Error::NoValue),
            Value::Bool(b) => *b,
            Value::I8(x) => *x != 0,
            Value::U8(x) => *x != 0,
            Value::I16(x) => *x != 0,
            Value::U16(x) => *x != 0,
            Value::I32(x) => *x != 0,
            Value::U32(x) => *x != 0,
            Value::I64(x) => *x != 0,
            Value::U64(x) => *x != 0,
            Value::F32(x) => *x != 0.0,
            Value::F64(x) => *x != 0.0,
        })
    }
}

macro_rules! impl_permissive_numeric {
    ($t:ty) => {
        impl Permissive for $t {
            fn from_value_permissive(value: &Value) -> Result<Self, Error> {
                Ok(match value {
                    Value::Null => return Err(Error::NoValue),
                    Value::Bool(b) => {
                        if *b {
                            1 as $t
                        } else {
                            0 as $t
                        }
                    }
                    Value::I8(x) => *x as $t,
                    Value::U8(x) => *x as $t,
                    Value::I16(x) => *x as $t,
                    Value::U16(x) => *x as $t,
                    Value::I32(x) => *x as $t,
                    Value::U32(x) => *x as $t,
                    Value::I64(x) => *x as $t,
                    Value::U64(x) => *x as $t,
                    Value::F32(x) => *x as $t,
                    Value::F64(x) => *x as $t,
                })
            }
        }
    };
}

impl_permissive_numeric!(i8);
impl_permissive_numeric!(u8);
impl_permissive_numeric!(i16);
impl_permissive_numeric!(u16);
impl_permissive_numeric!(i32);
impl_permissive_numeric!(u32);
impl_permissive_numeric!(i64);
impl_permissive_numeric!(u64);
impl_permissive_numeric!(f32);
impl_permissive_numeric!(f64);

macro_rules! impl_strict {
    ($t:ty, $variant:ident, $name:literal) => {
        impl Strict for $t {
            fn from_value_strict(value: &Value) -> Result<Self, Error> {
                match value {
                    Value::$variant(x) => Ok(*x),
                    other => Err(Error::TypeMismatch {
                        expected: $name,
                        stored: other.data_type().map(DataType::name).unwrap_or("null"),
                    }),
                }
            }
        }
    };
}

impl_strict!(bool, Bool, "bool");
impl_strict!(i8, I8, "i8");
impl_strict!(u8, U8, "u8");
impl_strict!(i16, I16, "i16");
impl_strict!(u16, U16, "u16");
impl_strict!(i32, I32, "i32");
impl_strict!(u32, U32, "u32");
impl_strict!(i64, I64, "i64");
impl_strict!(u64, U64, "u64");
impl_strict!(f32, F32, "f32");
impl_strict!(f64, F64, "f64");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_type_strict_and_permissive() {
        assert_eq!(Value::Bool(true).get_strict::<bool>().unwrap(), true);
        assert_eq!(Value::I8(-5).get_strict::<i8>().unwrap(), -5);
        assert_eq!(Value::U64(9).get_strict::<u64>().unwrap(), 9);
        assert_eq!(Value::F64(1.5).get_strict::<f64>().unwrap(), 1.5);

        assert_eq!(Value::I32(7).get::<f64>().unwrap(), 7.0);
        assert_eq!(Value::F32(2.9).get::<i32>().unwrap(), 2);
        assert_eq!(Value::Bool(true).get::<u8>().unwrap(), 1);
        assert_eq!(Value::U8(0).get::<bool>().unwrap(), false);
    }

    #[test]
    fn strict_rejects_wrong_variant() {
        let err = Value::I32(1).get_strict::<i64>().unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn permissive_and_strict_fail_on_null() {
        assert!(matches!(Value::Null.get::<i32>(), Err(Error::NoValue)));
        assert!(matches!(
            Value::Null.get_strict::<i32>(),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn data_type_codes_match_file_format_table() {
        assert_eq!(DataType::Void.code(), 0);
        assert_eq!(DataType::Bool.code(), 1);
        assert_eq!(DataType::F64.code(), 11);
        assert_eq!(DataType::from_code(7), Some(DataType::U32));
        assert_eq!(DataType::from_code(42), None);
    }
}
