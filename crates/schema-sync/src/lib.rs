//! Change-tracked state synchronization over a compact binary wire format.
//!
//! A [`Registry`] declares record types whose fields are primitives, nested
//! instances, maps or arrays. A [`Document`] holds one root instance of such a
//! type. The producer mutates it through explicit setters, then ships either a
//! full snapshot ([`Document::encode_full`]) or only what changed since the
//! last diff ([`Document::encode_diff`]). Mirrors apply those frames with
//! [`Document::decode`] and converge on the producer's state.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use schema_sync::{Document, PrimitiveType, Registry, SchemaDef, WireType};
//!
//! let mut builder = Registry::builder();
//! let player = builder
//!     .register(
//!         SchemaDef::new("Player")
//!             .field("name", PrimitiveType::Str)
//!             .field("x", PrimitiveType::F32),
//!     )
//!     .unwrap();
//! let state = builder
//!     .register(
//!         SchemaDef::new("State")
//!             .field("tick", PrimitiveType::U32)
//!             .field("players", WireType::map(player)),
//!     )
//!     .unwrap();
//! let registry = Arc::new(builder.build().unwrap());
//!
//! let mut producer = Document::new(Arc::clone(&registry), state).unwrap();
//! let mut mirror = Document::new(registry, state).unwrap();
//!
//! let root = producer.root();
//! producer.set(root, "tick", 1u32).unwrap();
//! let players = producer.container(root, "players").unwrap();
//! let p = producer.map_insert_instance(players, "alice").unwrap();
//! producer.set(p, "name", "Alice").unwrap();
//!
//! mirror.decode(&producer.encode_diff()).unwrap();
//! assert_eq!(mirror.to_json(), producer.to_json());
//! assert_eq!(mirror.to_json()["players"]["alice"]["name"], "Alice");
//! ```

mod change;
mod config;
mod decode;
mod document;
mod encode;
mod error;
mod identity;
mod node;
mod schema;
mod value;
mod wire;

pub use config::DocumentConfig;
pub use decode::{Change, ChangeKey, DecodeReport};
pub use document::Document;
pub use error::{DecodeError, MutationError};
pub use identity::RefId;
pub use schema::{
    Element, FieldDef, PrimitiveType, Registry, RegistryBuilder, SchemaDef, SchemaError,
    SchemaId, SchemaType, WireType, MAX_FIELDS,
};
pub use value::Value;
pub use wire::{FrameKind, OpKind, FRAME_DIFF, FRAME_FULL};

pub use schema_sync_buffers::BufferError;
