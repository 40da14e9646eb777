// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Metadata table schema and the `#~` stream layout.

Every table row is a fixed sequence of columns. The width of string, GUID
and blob columns depends on the heap size flags of the `#~` header and the
width of table and coded indices depends on row counts. Row offsets for a
table therefore can only be computed once the row count of every table is
known, which is why [TableLayout] covers all tables defined by ECMA-335
II.22 even though only a handful are interpreted by this crate.
*/

use {crate::ClrMetadataError, scroll::Pread};

/// Identifies a metadata table by its ECMA-335 number.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum TableId {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    FieldPtr = 0x03,
    Field = 0x04,
    MethodPtr = 0x05,
    MethodDef = 0x06,
    ParamPtr = 0x07,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0a,
    Constant = 0x0b,
    CustomAttribute = 0x0c,
    FieldMarshal = 0x0d,
    DeclSecurity = 0x0e,
    ClassLayout = 0x0f,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    EventPtr = 0x13,
    Event = 0x14,
    PropertyMap = 0x15,
    PropertyPtr = 0x16,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1a,
    TypeSpec = 0x1b,
    ImplMap = 0x1c,
    FieldRva = 0x1d,
    EncLog = 0x1e,
    EncMap = 0x1f,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOs = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOs = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2a,
    MethodSpec = 0x2b,
    GenericParamConstraint = 0x2c,
}

/// Number of defined tables. Table numbers are contiguous from 0.
pub const TABLE_COUNT: usize = 0x2d;

impl TableId {
    pub const ALL: [TableId; TABLE_COUNT] = [
        Self::Module,
        Self::TypeRef,
        Self::TypeDef,
        Self::FieldPtr,
        Self::Field,
        Self::MethodPtr,
        Self::MethodDef,
        Self::ParamPtr,
        Self::Param,
        Self::InterfaceImpl,
        Self::MemberRef,
        Self::Constant,
        Self::CustomAttribute,
        Self::FieldMarshal,
        Self::DeclSecurity,
        Self::ClassLayout,
        Self::FieldLayout,
        Self::StandAloneSig,
        Self::EventMap,
        Self::EventPtr,
        Self::Event,
        Self::PropertyMap,
        Self::PropertyPtr,
        Self::Property,
        Self::MethodSemantics,
        Self::MethodImpl,
        Self::ModuleRef,
        Self::TypeSpec,
        Self::ImplMap,
        Self::FieldRva,
        Self::EncLog,
        Self::EncMap,
        Self::Assembly,
        Self::AssemblyProcessor,
        Self::AssemblyOs,
        Self::AssemblyRef,
        Self::AssemblyRefProcessor,
        Self::AssemblyRefOs,
        Self::File,
        Self::ExportedType,
        Self::ManifestResource,
        Self::NestedClass,
        Self::GenericParam,
        Self::MethodSpec,
        Self::GenericParamConstraint,
    ];

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(number as usize).copied()
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    /// The columns making up a row of this table.
    pub fn columns(self) -> &'static [Column] {
        use {Column::*, TableId as T};

        match self {
            T::Module => &[U16, Str, Guid, Guid, Guid],
            T::TypeRef => &[Coded(CodedIndex::ResolutionScope), Str, Str],
            T::TypeDef => &[
                U32,
                Str,
                Str,
                Coded(CodedIndex::TypeDefOrRef),
                Index(T::Field),
                Index(T::MethodDef),
            ],
            T::FieldPtr => &[Index(T::Field)],
            T::Field => &[U16, Str, Blob],
            T::MethodPtr => &[Index(T::MethodDef)],
            T::MethodDef => &[U32, U16, U16, Str, Blob, Index(T::Param)],
            T::ParamPtr => &[Index(T::Param)],
            T::Param => &[U16, U16, Str],
            T::InterfaceImpl => &[Index(T::TypeDef), Coded(CodedIndex::TypeDefOrRef)],
            T::MemberRef => &[Coded(CodedIndex::MemberRefParent), Str, Blob],
            // The 1 byte type is followed by a 1 byte padding zero.
            T::Constant => &[U16, Coded(CodedIndex::HasConstant), Blob],
            T::CustomAttribute => &[
                Coded(CodedIndex::HasCustomAttribute),
                Coded(CodedIndex::CustomAttributeType),
                Blob,
            ],
            T::FieldMarshal => &[Coded(CodedIndex::HasFieldMarshal), Blob],
            T::DeclSecurity => &[U16, Coded(CodedIndex::HasDeclSecurity), Blob],
            T::ClassLayout => &[U16, U32, Index(T::TypeDef)],
            T::FieldLayout => &[U32, Index(T::Field)],
            T::StandAloneSig => &[Blob],
            T::EventMap => &[Index(T::TypeDef), Index(T::Event)],
            T::EventPtr => &[Index(T::Event)],
            T::Event => &[U16, Str, Coded(CodedIndex::TypeDefOrRef)],
            T::PropertyMap => &[Index(T::TypeDef), Index(T::Property)],
            T::PropertyPtr => &[Index(T::Property)],
            T::Property => &[U16, Str, Blob],
            T::MethodSemantics => &[
                U16,
                Index(T::MethodDef),
                Coded(CodedIndex::HasSemantics),
            ],
            T::MethodImpl => &[
                Index(T::TypeDef),
                Coded(CodedIndex::MethodDefOrRef),
                Coded(CodedIndex::MethodDefOrRef),
            ],
            T::ModuleRef => &[Str],
            T::TypeSpec => &[Blob],
            T::ImplMap => &[
                U16,
                Coded(CodedIndex::MemberForwarded),
                Str,
                Index(T::ModuleRef),
            ],
            T::FieldRva => &[U32, Index(T::Field)],
            T::EncLog => &[U32, U32],
            T::EncMap => &[U32],
            T::Assembly => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
            T::AssemblyProcessor => &[U32],
            T::AssemblyOs => &[U32, U32, U32],
            T::AssemblyRef => &[U16, U16, U16, U16, U32, Blob, Str, Str, Blob],
            T::AssemblyRefProcessor => &[U32, Index(T::AssemblyRef)],
            T::AssemblyRefOs => &[U32, U32, U32, Index(T::AssemblyRef)],
            T::File => &[U32, Str, Blob],
            T::ExportedType => &[U32, U32, Str, Str, Coded(CodedIndex::Implementation)],
            T::ManifestResource => &[U32, U32, Str, Coded(CodedIndex::Implementation)],
            T::NestedClass => &[Index(T::TypeDef), Index(T::TypeDef)],
            T::GenericParam => &[U16, U16, Coded(CodedIndex::TypeOrMethodDef), Str],
            T::MethodSpec => &[Coded(CodedIndex::MethodDefOrRef), Blob],
            T::GenericParamConstraint => &[
                Index(T::GenericParam),
                Coded(CodedIndex::TypeDefOrRef),
            ],
        }
    }
}

/// A column kind within a table row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Column {
    U16,
    U32,
    /// Index into the `#Strings` heap.
    Str,
    /// Index into the `#GUID` heap.
    Guid,
    /// Index into the `#Blob` heap.
    Blob,
    /// Simple index into another table.
    Index(TableId),
    /// Tagged index into one of several tables.
    Coded(CodedIndex),
}

/// Coded index kinds from ECMA-335 II.24.2.6.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CodedIndex {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedIndex {
    /// Tables addressed by this coded index, in tag order.
    ///
    /// `None` entries are reserved tags.
    pub fn tables(self) -> &'static [Option<TableId>] {
        use TableId as T;

        match self {
            Self::TypeDefOrRef => &[Some(T::TypeDef), Some(T::TypeRef), Some(T::TypeSpec)],
            Self::HasConstant => &[Some(T::Field), Some(T::Param), Some(T::Property)],
            Self::HasCustomAttribute => &[
                Some(T::MethodDef),
                Some(T::Field),
                Some(T::TypeRef),
                Some(T::TypeDef),
                Some(T::Param),
                Some(T::InterfaceImpl),
                Some(T::MemberRef),
                Some(T::Module),
                Some(T::DeclSecurity),
                Some(T::Property),
                Some(T::Event),
                Some(T::StandAloneSig),
                Some(T::ModuleRef),
                Some(T::TypeSpec),
                Some(T::Assembly),
                Some(T::AssemblyRef),
                Some(T::File),
                Some(T::ExportedType),
                Some(T::ManifestResource),
                Some(T::GenericParam),
                Some(T::GenericParamConstraint),
                Some(T::MethodSpec),
            ],
            Self::HasFieldMarshal => &[Some(T::Field), Some(T::Param)],
            Self::HasDeclSecurity => &[Some(T::TypeDef), Some(T::MethodDef), Some(T::Assembly)],
            Self::MemberRefParent => &[
                Some(T::TypeDef),
                Some(T::TypeRef),
                Some(T::ModuleRef),
                Some(T::MethodDef),
                Some(T::TypeSpec),
            ],
            Self::HasSemantics => &[Some(T::Event), Some(T::Property)],
            Self::MethodDefOrRef => &[Some(T::MethodDef), Some(T::MemberRef)],
            Self::MemberForwarded => &[Some(T::Field), Some(T::MethodDef)],
            Self::Implementation => &[Some(T::File), Some(T::AssemblyRef), Some(T::ExportedType)],
            Self::CustomAttributeType => &[None, None, Some(T::MethodDef), Some(T::MemberRef), None],
            Self::ResolutionScope => &[
                Some(T::Module),
                Some(T::ModuleRef),
                Some(T::AssemblyRef),
                Some(T::TypeRef),
            ],
            Self::TypeOrMethodDef => &[Some(T::TypeDef), Some(T::MethodDef)],
        }
    }

    /// Number of low bits holding the tag.
    pub fn tag_bits(self) -> u32 {
        match self {
            Self::HasFieldMarshal
            | Self::HasSemantics
            | Self::MethodDefOrRef
            | Self::MemberForwarded
            | Self::TypeOrMethodDef => 1,
            Self::TypeDefOrRef
            | Self::HasConstant
            | Self::HasDeclSecurity
            | Self::Implementation
            | Self::ResolutionScope => 2,
            Self::MemberRefParent | Self::CustomAttributeType => 3,
            Self::HasCustomAttribute => 5,
        }
    }

    /// Split a raw coded value into its target.
    ///
    /// Returns `Ok(None)` for null references (row 0).
    pub fn decode(self, value: u32) -> Result<Option<MetadataToken>, ClrMetadataError> {
        let bits = self.tag_bits();
        let tag = value & ((1 << bits) - 1);
        let row = value >> bits;

        let table = self
            .tables()
            .get(tag as usize)
            .copied()
            .flatten()
            .ok_or(ClrMetadataError::BadCodedIndex { kind: self, tag })?;

        Ok(if row == 0 {
            None
        } else {
            Some(MetadataToken::new(table, row))
        })
    }

    /// Produce the raw coded value referencing `token`.
    ///
    /// Returns `None` if this coded index cannot address the token's table.
    pub fn encode(self, token: MetadataToken) -> Option<u32> {
        let tag = self
            .tables()
            .iter()
            .position(|t| *t == Some(token.table))?;

        Some((token.row << self.tag_bits()) | tag as u32)
    }
}

/// A (table, row) pair. Rows are 1-based.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MetadataToken {
    pub table: TableId,
    pub row: u32,
}

impl MetadataToken {
    pub fn new(table: TableId, row: u32) -> Self {
        Self { table, row }
    }

    /// The 32-bit token value as it appears in IL and signatures.
    pub fn value(&self) -> u32 {
        ((self.table.number() as u32) << 24) | self.row
    }
}

impl std::fmt::Display for MetadataToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.value())
    }
}

/// `#~` header flag: `#Strings` indices are 4 bytes.
pub const HEAP_SIZE_WIDE_STRINGS: u8 = 0x01;
/// `#~` header flag: `#GUID` indices are 4 bytes.
pub const HEAP_SIZE_WIDE_GUIDS: u8 = 0x02;
/// `#~` header flag: `#Blob` indices are 4 bytes.
pub const HEAP_SIZE_WIDE_BLOBS: u8 = 0x04;
/// `#~` header flag: an extra 4 bytes follow the row counts.
const HEAP_SIZE_EXTRA_DATA: u8 = 0x40;

/// Sizing information needed to compute row widths.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableLayout {
    pub heap_sizes: u8,
    pub row_counts: [u32; TABLE_COUNT],
}

impl TableLayout {
    pub fn row_count(&self, table: TableId) -> u32 {
        self.row_counts[table as usize]
    }

    fn heap_index_width(&self, flag: u8) -> usize {
        if self.heap_sizes & flag != 0 {
            4
        } else {
            2
        }
    }

    /// Width in bytes of a column.
    pub fn column_width(&self, column: Column) -> usize {
        match column {
            Column::U16 => 2,
            Column::U32 => 4,
            Column::Str => self.heap_index_width(HEAP_SIZE_WIDE_STRINGS),
            Column::Guid => self.heap_index_width(HEAP_SIZE_WIDE_GUIDS),
            Column::Blob => self.heap_index_width(HEAP_SIZE_WIDE_BLOBS),
            Column::Index(table) => {
                if self.row_count(table) < 0x1_0000 {
                    2
                } else {
                    4
                }
            }
            Column::Coded(kind) => {
                let max_rows = kind
                    .tables()
                    .iter()
                    .flatten()
                    .map(|t| self.row_count(*t))
                    .max()
                    .unwrap_or(0);

                if max_rows < (1 << (16 - kind.tag_bits())) {
                    2
                } else {
                    4
                }
            }
        }
    }

    pub fn row_size(&self, table: TableId) -> usize {
        table
            .columns()
            .iter()
            .map(|c| self.column_width(*c))
            .sum()
    }
}

/// A parsed `#~` stream header.
///
/// Offsets are relative to the start of the stream.
#[derive(Clone, Debug)]
pub struct TablesHeader {
    pub layout: TableLayout,
    pub table_offsets: [usize; TABLE_COUNT],
    pub end_offset: usize,
}

impl TablesHeader {
    pub fn parse(data: &[u8]) -> Result<Self, ClrMetadataError> {
        let offset = &mut 0;

        let _reserved = data.gread_with::<u32>(offset, scroll::LE)?;
        let _major = data.gread_with::<u8>(offset, scroll::LE)?;
        let _minor = data.gread_with::<u8>(offset, scroll::LE)?;
        let heap_sizes = data.gread_with::<u8>(offset, scroll::LE)?;
        let _reserved = data.gread_with::<u8>(offset, scroll::LE)?;
        let valid = data.gread_with::<u64>(offset, scroll::LE)?;
        let _sorted = data.gread_with::<u64>(offset, scroll::LE)?;

        let mut row_counts = [0u32; TABLE_COUNT];

        for bit in 0..64u8 {
            if valid & (1 << bit) == 0 {
                continue;
            }

            let table = TableId::from_number(bit).ok_or(ClrMetadataError::UnknownTable(bit))?;
            row_counts[table as usize] = data.gread_with::<u32>(offset, scroll::LE)?;
        }

        if heap_sizes & HEAP_SIZE_EXTRA_DATA != 0 {
            *offset += 4;
        }

        let layout = TableLayout {
            heap_sizes,
            row_counts,
        };

        let mut table_offsets = [0usize; TABLE_COUNT];
        let mut position = *offset;

        for table in TableId::ALL {
            table_offsets[table as usize] = position;
            position += layout.row_size(table) * layout.row_count(table) as usize;
        }

        if position > data.len() {
            return Err(ClrMetadataError::Scroll(scroll::Error::TooBig {
                size: position,
                len: data.len(),
            }));
        }

        Ok(Self {
            layout,
            table_offsets,
            end_offset: position,
        })
    }

    /// Read a single cell. `row` is 1-based.
    pub fn cell(
        &self,
        data: &[u8],
        table: TableId,
        row: u32,
        column: usize,
    ) -> Result<u32, ClrMetadataError> {
        if row == 0 || row > self.layout.row_count(table) {
            return Err(ClrMetadataError::RowOutOfRange { table, row });
        }

        let columns = table.columns();
        let column_kind = columns
            .get(column)
            .copied()
            .ok_or(ClrMetadataError::RowOutOfRange { table, row })?;

        let mut offset = self.table_offsets[table as usize]
            + (row as usize - 1) * self.layout.row_size(table);

        offset += columns[..column]
            .iter()
            .map(|c| self.layout.column_width(*c))
            .sum::<usize>();

        Ok(match self.layout.column_width(column_kind) {
            2 => data.pread_with::<u16>(offset, scroll::LE)? as u32,
            _ => data.pread_with::<u32>(offset, scroll::LE)?,
        })
    }
}
