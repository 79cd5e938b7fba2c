//! Static per-type field descriptor tables.
//!
//! A [`Registry`] is built once, before any document exists, and shared by
//! the producing and every consuming side of a stream. Encoder and decoder
//! consult it for field order and wire types; none of this is transmitted.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Maximum number of fields a single schema type may declare.
pub const MAX_FIELDS: usize = 256;

/// Index of a type inside a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub u16);

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema#{}", self.0)
    }
}

/// Fixed-width scalar kinds plus strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Str,
}

impl PrimitiveType {
    /// Encoded width in bytes, `None` for length-prefixed strings.
    pub fn width(self) -> Option<usize> {
        match self {
            Self::Bool | Self::U8 | Self::I8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 | Self::F32 => Some(4),
            Self::U64 | Self::I64 | Self::F64 => Some(8),
            Self::Str => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "uint8",
            Self::I8 => "int8",
            Self::U16 => "uint16",
            Self::I16 => "int16",
            Self::U32 => "uint32",
            Self::I32 => "int32",
            Self::U64 => "uint64",
            Self::I64 => "int64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Str => "string",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element type of a map or array container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Primitive(PrimitiveType),
    Ref(SchemaId),
}

impl From<PrimitiveType> for Element {
    fn from(p: PrimitiveType) -> Self {
        Self::Primitive(p)
    }
}

impl From<SchemaId> for Element {
    fn from(id: SchemaId) -> Self {
        Self::Ref(id)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Ref(id) => write!(f, "{id}"),
        }
    }
}

/// Wire type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Primitive(PrimitiveType),
    /// Nested instance, exclusively owned by the field.
    Ref(SchemaId),
    Map(Element),
    Array(Element),
}

impl WireType {
    pub fn map(element: impl Into<Element>) -> Self {
        Self::Map(element.into())
    }

    pub fn array(element: impl Into<Element>) -> Self {
        Self::Array(element.into())
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::Map(_) | Self::Array(_))
    }
}

impl From<PrimitiveType> for WireType {
    fn from(p: PrimitiveType) -> Self {
        Self::Primitive(p)
    }
}

impl From<SchemaId> for WireType {
    fn from(id: SchemaId) -> Self {
        Self::Ref(id)
    }
}

impl From<Element> for WireType {
    fn from(el: Element) -> Self {
        match el {
            Element::Primitive(p) => Self::Primitive(p),
            Element::Ref(id) => Self::Ref(id),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Ref(id) => write!(f, "{id}"),
            Self::Map(el) => write!(f, "map<{el}>"),
            Self::Array(el) => write!(f, "array<{el}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub wire: WireType,
}

/// Ordered field list of one schema type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl SchemaDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field; declaration order is wire order.
    pub fn field(mut self, name: impl Into<String>, wire: impl Into<WireType>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            wire: wire.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{0} was declared but never defined")]
    Undefined(SchemaId),
    #[error("{0} is not declared in this registry")]
    UnknownType(SchemaId),
    #[error("{id} was declared as `{declared}` but defined as `{defined}`")]
    NameMismatch {
        id: SchemaId,
        declared: String,
        defined: String,
    },
    #[error("type `{schema}` declares field `{field}` twice")]
    DuplicateField { schema: String, field: String },
    #[error("type `{schema}` field `{field}` references undeclared {target}")]
    UnknownReference {
        schema: String,
        field: String,
        target: SchemaId,
    },
    #[error("type `{schema}` declares {count} fields, the limit is {MAX_FIELDS}")]
    TooManyFields { schema: String, count: usize },
    #[error("registry cannot hold more than {} types", u16::MAX)]
    TooManyTypes,
}

/// A built, validated schema type.
#[derive(Debug, Clone)]
pub struct SchemaType {
    pub name: String,
    pub fields: Vec<FieldDef>,
    by_name: HashMap<String, usize>,
}

impl SchemaType {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn field(&self, index: usize) -> Option<&FieldDef> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// The immutable descriptor table.
#[derive(Debug, Clone)]
pub struct Registry {
    types: Vec<SchemaType>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, id: SchemaId) -> Option<&SchemaType> {
        self.types.get(id.0 as usize)
    }

    pub fn name(&self, id: SchemaId) -> &str {
        self.get(id).map(|t| t.name.as_str()).unwrap_or("?")
    }

    /// Looks a type up by name.
    pub fn find(&self, name: &str) -> Option<SchemaId> {
        self.types
            .iter()
            .position(|t| t.name == name)
            .map(|i| SchemaId(i as u16))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }
}

/// Two-phase builder: `declare` hands out ids so types can reference each
/// other (or themselves) before they are defined.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    names: Vec<String>,
    defs: Vec<Option<SchemaDef>>,
}

impl RegistryBuilder {
    pub fn declare(&mut self, name: impl Into<String>) -> Result<SchemaId, SchemaError> {
        let id = u16::try_from(self.names.len()).map_err(|_| SchemaError::TooManyTypes)?;
        self.names.push(name.into());
        self.defs.push(None);
        Ok(SchemaId(id))
    }

    pub fn define(&mut self, id: SchemaId, def: SchemaDef) -> Result<(), SchemaError> {
        let slot = self
            .defs
            .get_mut(id.0 as usize)
            .ok_or(SchemaError::UnknownType(id))?;
        *slot = Some(def);
        Ok(())
    }

    /// `declare` followed by `define`.
    pub fn register(&mut self, def: SchemaDef) -> Result<SchemaId, SchemaError> {
        let id = self.declare(def.name.clone())?;
        self.define(id, def)?;
        Ok(id)
    }

    pub fn build(self) -> Result<Registry, SchemaError> {
        let count = self.defs.len();
        let mut types = Vec::with_capacity(count);
        for (i, (declared, def)) in self.names.into_iter().zip(self.defs).enumerate() {
            let id = SchemaId(i as u16);
            let def = def.ok_or(SchemaError::Undefined(id))?;
            if def.name != declared {
                return Err(SchemaError::NameMismatch {
                    id,
                    declared,
                    defined: def.name,
                });
            }
            if def.fields.len() > MAX_FIELDS {
                return Err(SchemaError::TooManyFields {
                    schema: def.name,
                    count: def.fields.len(),
                });
            }
            let mut by_name = HashMap::with_capacity(def.fields.len());
            for (index, field) in def.fields.iter().enumerate() {
                if by_name.insert(field.name.clone(), index).is_some() {
                    return Err(SchemaError::DuplicateField {
                        schema: def.name.clone(),
                        field: field.name.clone(),
                    });
                }
                let target = match field.wire {
                    WireType::Ref(t)
                    | WireType::Map(Element::Ref(t))
                    | WireType::Array(Element::Ref(t)) => t,
                    _ => continue,
                };
                if target.0 as usize >= count {
                    return Err(SchemaError::UnknownReference {
                        schema: def.name.clone(),
                        field: field.name.clone(),
                        target,
                    });
                }
            }
            types.push(SchemaType {
                name: def.name,
                fields: def.fields,
                by_name,
            });
        }
        Ok(Registry { types })
    }
}
