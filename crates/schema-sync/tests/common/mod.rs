#![allow(dead_code)]

use std::sync::Arc;

use schema_sync::{Document, PrimitiveType, Registry, SchemaDef, SchemaId, WireType};

pub struct Types {
    pub registry: Arc<Registry>,
    pub state: SchemaId,
    pub player: SchemaId,
    pub deep_state: SchemaId,
    pub another: SchemaId,
    pub position: SchemaId,
}

/// Game-state style fixture shared by the integration tests.
pub fn types() -> Types {
    let mut b = Registry::builder();
    let player = b
        .register(
            SchemaDef::new("Player")
                .field("name", PrimitiveType::Str)
                .field("x", PrimitiveType::F32)
                .field("y", PrimitiveType::F32),
        )
        .expect("Player must register");
    let state = b
        .register(
            SchemaDef::new("State")
                .field("num", PrimitiveType::I32)
                .field("mapOfNum", WireType::map(PrimitiveType::I32))
                .field("arrayOfNum", WireType::array(PrimitiveType::I32))
                .field("fieldString", PrimitiveType::Str)
                .field("mapOfPlayers", WireType::map(player)),
        )
        .expect("State must register");
    let position = b
        .register(
            SchemaDef::new("Position")
                .field("x", PrimitiveType::F32)
                .field("y", PrimitiveType::F32)
                .field("z", PrimitiveType::F32),
        )
        .expect("Position must register");
    let another = b
        .register(SchemaDef::new("Another").field("position", position))
        .expect("Another must register");
    let deep_state = b
        .register(SchemaDef::new("DeepState2").field("mapOfEntities", WireType::map(another)))
        .expect("DeepState2 must register");
    Types {
        registry: Arc::new(b.build().expect("registry must build")),
        state,
        player,
        deep_state,
        another,
        position,
    }
}

pub fn document(types: &Types, root: SchemaId) -> Document {
    Document::new(Arc::clone(&types.registry), root).expect("root type must exist")
}

/// Encodes one diff and applies it to every mirror.
pub fn sync(producer: &mut Document, mirrors: &mut [Document]) -> Vec<u8> {
    let diff = producer.encode_diff();
    for (i, mirror) in mirrors.iter_mut().enumerate() {
        mirror
            .decode(&diff)
            .unwrap_or_else(|e| panic!("mirror {i} failed to decode diff: {e}"));
    }
    diff
}

pub fn assert_converged(producer: &Document, mirrors: &[Document], context: &str) {
    let expected = producer.to_json();
    for (i, mirror) in mirrors.iter().enumerate() {
        assert_eq!(mirror.to_json(), expected, "mirror {i} diverged ({context})");
    }
}
