// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::tables::{CodedIndex, MetadataToken, TableId},
    thiserror::Error,
};

/// Unified error type for reading CLI metadata.
#[derive(Debug, Error)]
pub enum ClrMetadataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PE parsing error: {0}")]
    Goblin(#[from] goblin::error::Error),

    #[error("data structure parse error: {0}")]
    Scroll(#[from] scroll::Error),

    #[error("not a managed module: PE image has no CLI header")]
    NoCliHeader,

    #[error("RVA {0:#x} does not map to a section")]
    UnmappedRva(u32),

    #[error("bad metadata signature: {0:#x}")]
    BadMetadataSignature(u32),

    #[error("metadata stream {0} not present")]
    MissingStream(&'static str),

    #[error("uncompressed (#-) metadata tables are not supported")]
    UncompressedTables,

    #[error("unknown metadata table {0:#x} is marked present")]
    UnknownTable(u8),

    #[error("{heap} heap index {index:#x} out of range")]
    HeapIndex { heap: &'static str, index: u32 },

    #[error("row {row} out of range for table {table:?}")]
    RowOutOfRange { table: TableId, row: u32 },

    #[error("invalid tag {tag} in {kind:?} coded index")]
    BadCodedIndex { kind: CodedIndex, tag: u32 },

    #[error("{kind:?} coded index cannot reference {token}")]
    UnencodableToken { kind: CodedIndex, token: MetadataToken },

    #[error("malformed compressed integer")]
    BadCompressedInteger,

    #[error("malformed signature: {0}")]
    BadSignature(&'static str),

    #[error("malformed custom attribute value: {0}")]
    BadAttributeValue(String),

    #[error("string heap entry is not valid UTF-8")]
    BadUtf8,

    #[error("type reference chain is too deep or cyclic")]
    TypeReferenceDepth,
}
