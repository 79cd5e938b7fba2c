//! Error types.

use schema_sync_buffers::BufferError;
use thiserror::Error;

use crate::identity::RefId;
use crate::schema::{PrimitiveType, SchemaId, WireType};
use crate::wire::OpKind;

/// Usage errors at the mutation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("unknown schema {0}")]
    UnknownSchema(SchemaId),
    #[error("no node {0} in this document")]
    UnknownRef(RefId),
    #[error("{id} is a {found}, expected {expected}")]
    WrongShape {
        id: RefId,
        expected: &'static str,
        found: &'static str,
    },
    #[error("type `{schema}` has no field `{field}`")]
    UnknownField { schema: String, field: String },
    #[error("`{field}` is declared as {expected}, got a {found} value")]
    TypeMismatch {
        field: String,
        expected: WireType,
        found: PrimitiveType,
    },
    #[error("`{field}` is declared as {expected}, which is not a {wanted}")]
    NotA {
        field: String,
        expected: WireType,
        wanted: &'static str,
    },
    #[error("container field `{0}` cannot be unset")]
    ContainerUnset(String),
    #[error("field `{0}` holds no node")]
    FieldUnset(String),
    #[error("index {index} out of range for array {id} of length {len}")]
    IndexOutOfRange { id: RefId, index: usize, len: usize },
    #[error("reference id space exhausted")]
    IdsExhausted,
}

/// Fatal errors of one `decode` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error("empty buffer")]
    Empty,
    #[error("unknown frame byte {0:#04x}")]
    UnknownFrame(u8),
    #[error("snapshot root is {found}, this document's root is {expected}")]
    RootMismatch { expected: SchemaId, found: u64 },
    #[error("unknown op kind {kind} at offset {offset}")]
    UnknownOpKind { kind: u8, offset: usize },
    #[error("reference {value} at offset {offset} is out of range")]
    RefOutOfRange { value: u64, offset: usize },
    #[error("op at offset {offset} targets unknown node #{target}")]
    UnknownTarget { target: u32, offset: usize },
    #[error("{kind} is not valid on a {shape} (offset {offset})")]
    InvalidOp {
        kind: OpKind,
        shape: &'static str,
        offset: usize,
    },
    #[error("field index {index} out of range for `{schema}` (offset {offset})")]
    FieldOutOfRange {
        schema: String,
        index: u64,
        offset: usize,
    },
    #[error("map entry #{entry} is unknown (offset {offset})")]
    UnknownEntry { entry: u32, offset: usize },
    #[error("map entry #{entry} is keyed `{existing}`, stream says `{found}` (offset {offset})")]
    EntryKeyMismatch {
        entry: u32,
        existing: String,
        found: String,
        offset: usize,
    },
    #[error("array index {index} past length {len} (offset {offset})")]
    IndexOutOfRange {
        index: u64,
        len: usize,
        offset: usize,
    },
    #[error("child declared as {expected}, stream carries schema {found} (offset {offset})")]
    ChildTypeMismatch {
        expected: SchemaId,
        found: u64,
        offset: usize,
    },
    #[error("node #{id} already exists elsewhere in the graph (offset {offset})")]
    RefInUse { id: u32, offset: usize },
    #[error("invalid bool byte {byte:#04x} at offset {offset}")]
    InvalidBool { byte: u8, offset: usize },
    #[error("frame exceeds {limit} operations")]
    TooManyOps { limit: usize },
}
