//! Frame and operation layout.
//!
//! ```text
//! frame   := FULL vu57(root schema) op* | DIFF op*
//! op      := vu57(target) u8(kind) vu57(key) payload
//! payload := SET:    item
//!          | UNSET:  (nothing)
//!          | INSERT: str(map key) item
//!          | DELETE: (nothing)
//! item    := value | vu57(child) [vu57(schema)]
//! ```
//!
//! `key` is a field index for instance targets, an entry id for maps, and a
//! position for arrays. A DELETE on an array truncates it to `key`. Unset is
//! an op kind of its own, never a value pattern, so no encoded value can be
//! mistaken for it.

use std::fmt;

use crate::error::DecodeError;

pub const FRAME_FULL: u8 = 0xf0;
pub const FRAME_DIFF: u8 = 0xd1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Full,
    Diff,
}

impl FrameKind {
    pub fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        match byte {
            FRAME_FULL => Ok(Self::Full),
            FRAME_DIFF => Ok(Self::Diff),
            _ => Err(DecodeError::UnknownFrame(byte)),
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            Self::Full => FRAME_FULL,
            Self::Diff => FRAME_DIFF,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Diff => "diff",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpKind {
    Set = 0,
    Unset = 1,
    Insert = 2,
    Delete = 3,
}

impl OpKind {
    pub fn from_byte(byte: u8, offset: usize) -> Result<Self, DecodeError> {
        match byte {
            0 => Ok(Self::Set),
            1 => Ok(Self::Unset),
            2 => Ok(Self::Insert),
            3 => Ok(Self::Delete),
            kind => Err(DecodeError::UnknownOpKind { kind, offset }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Unset => "unset",
            Self::Insert => "insert",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
