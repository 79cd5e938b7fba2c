//! Primitive values and their fixed-width wire codec.

use schema_sync_buffers::{Reader, Writer};
use serde_json::{Number, Value as Json};

use crate::error::DecodeError;
use crate::schema::PrimitiveType;

/// A primitive field or container element value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl Value {
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::Bool(_) => PrimitiveType::Bool,
            Self::U8(_) => PrimitiveType::U8,
            Self::I8(_) => PrimitiveType::I8,
            Self::U16(_) => PrimitiveType::U16,
            Self::I16(_) => PrimitiveType::I16,
            Self::U32(_) => PrimitiveType::U32,
            Self::I32(_) => PrimitiveType::I32,
            Self::U64(_) => PrimitiveType::U64,
            Self::I64(_) => PrimitiveType::I64,
            Self::F32(_) => PrimitiveType::F32,
            Self::F64(_) => PrimitiveType::F64,
            Self::Str(_) => PrimitiveType::Str,
        }
    }

    /// Integer view of any integral variant.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::U8(v) => Some(v.into()),
            Self::I8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::U64(v) => i64::try_from(v).ok(),
            Self::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(v.into()),
            Self::F64(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Writes the value in the fixed layout of its own type.
    pub fn write(&self, w: &mut Writer) {
        match self {
            Self::Bool(v) => w.u8(u8::from(*v)),
            Self::U8(v) => w.u8(*v),
            Self::I8(v) => w.i8(*v),
            Self::U16(v) => w.u16(*v),
            Self::I16(v) => w.i16(*v),
            Self::U32(v) => w.u32(*v),
            Self::I32(v) => w.i32(*v),
            Self::U64(v) => w.u64(*v),
            Self::I64(v) => w.i64(*v),
            Self::F32(v) => w.f32(*v),
            Self::F64(v) => w.f64(*v),
            Self::Str(s) => {
                w.str(s);
            }
        }
    }

    /// Reads a value of the declared type. Strings longer than
    /// `max_string_bytes` are rejected.
    pub fn read(
        ty: PrimitiveType,
        r: &mut Reader<'_>,
        max_string_bytes: usize,
    ) -> Result<Self, DecodeError> {
        let value = match ty {
            PrimitiveType::Bool => {
                let offset = r.x;
                match r.u8()? {
                    0 => Self::Bool(false),
                    1 => Self::Bool(true),
                    byte => return Err(DecodeError::InvalidBool { byte, offset }),
                }
            }
            PrimitiveType::U8 => Self::U8(r.u8()?),
            PrimitiveType::I8 => Self::I8(r.i8()?),
            PrimitiveType::U16 => Self::U16(r.u16()?),
            PrimitiveType::I16 => Self::I16(r.i16()?),
            PrimitiveType::U32 => Self::U32(r.u32()?),
            PrimitiveType::I32 => Self::I32(r.i32()?),
            PrimitiveType::U64 => Self::U64(r.u64()?),
            PrimitiveType::I64 => Self::I64(r.i64()?),
            PrimitiveType::F32 => Self::F32(r.f32()?),
            PrimitiveType::F64 => Self::F64(r.f64()?),
            PrimitiveType::Str => Self::Str(r.str(max_string_bytes)?.to_owned()),
        };
        Ok(value)
    }

    /// Plain JSON projection. Non-finite floats become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Bool(v) => Json::Bool(*v),
            Self::U8(v) => Json::from(*v),
            Self::I8(v) => Json::from(*v),
            Self::U16(v) => Json::from(*v),
            Self::I16(v) => Json::from(*v),
            Self::U32(v) => Json::from(*v),
            Self::I32(v) => Json::from(*v),
            Self::U64(v) => Json::from(*v),
            Self::I64(v) => Json::from(*v),
            Self::F32(v) => float_json(f64::from(*v)),
            Self::F64(v) => float_json(*v),
            Self::Str(s) => Json::String(s.clone()),
        }
    }
}

fn float_json(v: f64) -> Json {
    Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null)
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from!(
    bool => Bool,
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => Str,
);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}
