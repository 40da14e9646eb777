// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Typed access to the metadata of a single module. */

use {
    crate::{
        heaps::{BlobHeap, StringsHeap},
        pe::{find_metadata, MetadataRoot},
        signature::{
            decode_fixed_arguments, parse_field_signature, parse_member_signature,
            parse_method_signature, parse_type_spec, AttributeTypeResolver, AttributeValue,
            MemberSignature, MethodSignature, SigType,
        },
        tables::{CodedIndex, MetadataToken, TableId, TablesHeader},
        ClrMetadataError,
    },
    log::debug,
    once_cell::unsync::OnceCell,
    std::{
        collections::HashMap,
        fmt::{Display, Formatter},
        ops::Range,
        path::{Path, PathBuf},
    },
};

/// Maximum nesting followed when resolving enclosing types.
const MAX_NESTING_DEPTH: usize = 64;

/// `FieldAttributes.Static`.
pub const FIELD_ATTRIBUTE_STATIC: u16 = 0x0010;

/// A namespace qualified type name.
///
/// Nested types carry the names of their enclosing types, outermost first,
/// and share the namespace of the outermost type.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TypeName {
    pub namespace: String,
    pub name: String,
    pub enclosing: Vec<String>,
}

impl TypeName {
    pub fn new(namespace: impl ToString, name: impl ToString) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            enclosing: vec![],
        }
    }

    /// Name a type nested inside this one.
    pub fn nested(&self, name: impl ToString) -> Self {
        let mut enclosing = self.enclosing.clone();
        enclosing.push(self.name.clone());

        Self {
            namespace: self.namespace.clone(),
            name: name.to_string(),
            enclosing,
        }
    }

    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.enclosing.is_empty() && self.namespace == namespace && self.name == name
    }

    /// Names from the outermost type to this one.
    pub fn path(&self) -> impl Iterator<Item = &str> {
        self.enclosing
            .iter()
            .map(|s| s.as_str())
            .chain(std::iter::once(self.name.as_str()))
    }
}

impl Display for TypeName {
    /// Renders as `Namespace.Outer/Inner`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{}.", self.namespace)?;
        }

        write!(f, "{}", self.path().collect::<Vec<_>>().join("/"))
    }
}

/// A row of the `AssemblyRef` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssemblyReference {
    pub token: MetadataToken,
    pub name: String,
    pub culture: String,
    pub version: [u16; 4],
}

/// Where a referenced type is defined.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeScope {
    /// The module doing the referencing.
    CurrentModule,
    /// Another module of the same assembly.
    ModuleReference(String),
    /// Another assembly, by name.
    Assembly(String),
    /// No resolution scope; the type is found through `ExportedType`.
    Exported,
}

/// A resolved row of the `TypeRef` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeReference {
    pub token: MetadataToken,
    pub name: TypeName,
    pub scope: TypeScope,
}

impl TypeReference {
    /// The name of the assembly defining the type, if it lives in another assembly.
    pub fn assembly_name(&self) -> Option<&str> {
        match &self.scope {
            TypeScope::Assembly(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// The parent of a `MemberRef`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemberParent {
    /// A type defined elsewhere. Generic instantiations are reported as their generic type.
    TypeReference(TypeReference),
    /// A type defined in this module.
    TypeDefinition(MetadataToken),
    /// A global member of another module.
    ModuleReference(String),
    /// A vararg call site of a method defined in this module.
    MethodDefinition(MetadataToken),
    /// Any other type specification (arrays, pointers, generic parameters).
    TypeSpecification(MetadataToken),
}

impl MemberParent {
    pub fn type_reference(&self) -> Option<&TypeReference> {
        match self {
            Self::TypeReference(r) => Some(r),
            _ => None,
        }
    }
}

/// A row of the `MemberRef` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemberReference {
    pub token: MetadataToken,
    pub name: String,
    pub parent: MemberParent,
    pub signature_blob: Vec<u8>,
}

impl MemberReference {
    pub fn signature(&self) -> Result<MemberSignature, ClrMetadataError> {
        parse_member_signature(&self.signature_blob)
    }
}

/// A row of the `TypeDef` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeDefinition {
    pub token: MetadataToken,
    pub flags: u32,
    pub name: TypeName,
    pub extends: Option<MetadataToken>,
}

/// A row of the `MethodDef` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodDefinition {
    pub token: MetadataToken,
    pub name: String,
    pub flags: u16,
    pub signature_blob: Vec<u8>,
}

impl MethodDefinition {
    pub fn signature(&self) -> Result<MethodSignature, ClrMetadataError> {
        parse_method_signature(&self.signature_blob)
    }
}

/// A row of the `Field` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldDefinition {
    pub token: MetadataToken,
    pub name: String,
    pub flags: u16,
    pub signature_blob: Vec<u8>,
}

impl FieldDefinition {
    pub fn is_static(&self) -> bool {
        self.flags & FIELD_ATTRIBUTE_STATIC != 0
    }

    pub fn field_type(&self) -> Result<SigType, ClrMetadataError> {
        parse_field_signature(&self.signature_blob)
    }
}

/// A row of the `Property` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyDefinition {
    pub token: MetadataToken,
    pub name: String,
    pub flags: u16,
}

/// A row of the `CustomAttribute` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CustomAttribute {
    pub token: MetadataToken,
    pub parent: MetadataToken,
    /// The `MethodDef` or `MemberRef` of the attribute constructor.
    pub constructor: MetadataToken,
    pub value: Vec<u8>,
}

type TypeIndexKey = (Option<u32>, String, String);

/// A managed module loaded into memory.
pub struct Assembly {
    path: Option<PathBuf>,
    data: Vec<u8>,
    runtime_version: String,
    tables: Range<usize>,
    strings: Range<usize>,
    blobs: Range<usize>,
    header: TablesHeader,
    enclosing_types: OnceCell<HashMap<u32, u32>>,
    type_index: OnceCell<HashMap<TypeIndexKey, u32>>,
    method_owners: OnceCell<Vec<u32>>,
    attribute_index: OnceCell<HashMap<MetadataToken, Vec<u32>>>,
}

impl std::fmt::Debug for Assembly {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembly")
            .field("path", &self.path)
            .field("runtime_version", &self.runtime_version)
            .field("size", &self.data.len())
            .finish()
    }
}

impl Assembly {
    /// Read a module from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ClrMetadataError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;

        let mut assembly = Self::from_pe_bytes(data)?;
        assembly.path = Some(path.to_path_buf());

        Ok(assembly)
    }

    /// Parse a module from the bytes of a PE image.
    pub fn from_pe_bytes(data: Vec<u8>) -> Result<Self, ClrMetadataError> {
        let metadata = find_metadata(&data)?;
        let root = MetadataRoot::parse(&data[metadata.clone()])?;

        if root.stream("#-").is_some() {
            return Err(ClrMetadataError::UncompressedTables);
        }

        let relocate = |r: Range<usize>| metadata.start + r.start..metadata.start + r.end;

        let tables = relocate(
            root.stream("#~")
                .ok_or(ClrMetadataError::MissingStream("#~"))?,
        );
        let strings = relocate(
            root.stream("#Strings")
                .ok_or(ClrMetadataError::MissingStream("#Strings"))?,
        );
        let blobs = root.stream("#Blob").map(relocate).unwrap_or(0..0);

        let header = TablesHeader::parse(&data[tables.clone()])?;

        Ok(Self {
            path: None,
            runtime_version: root.version,
            data,
            tables,
            strings,
            blobs,
            header,
            enclosing_types: OnceCell::new(),
            type_index: OnceCell::new(),
            method_owners: OnceCell::new(),
            attribute_index: OnceCell::new(),
        })
    }

    /// The file this module was read from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runtime version recorded in the metadata root.
    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    pub fn row_count(&self, table: TableId) -> u32 {
        self.header.layout.row_count(table)
    }

    fn cell(&self, table: TableId, row: u32, column: usize) -> Result<u32, ClrMetadataError> {
        self.header
            .cell(&self.data[self.tables.clone()], table, row, column)
    }

    fn string(&self, table: TableId, row: u32, column: usize) -> Result<String, ClrMetadataError> {
        let index = self.cell(table, row, column)?;

        Ok(StringsHeap::new(&self.data[self.strings.clone()])
            .get(index)?
            .to_string())
    }

    fn blob(&self, table: TableId, row: u32, column: usize) -> Result<&[u8], ClrMetadataError> {
        let index = self.cell(table, row, column)?;

        BlobHeap::new(&self.data[self.blobs.clone()]).get(index)
    }

    fn coded(
        &self,
        table: TableId,
        row: u32,
        column: usize,
        kind: CodedIndex,
    ) -> Result<Option<MetadataToken>, ClrMetadataError> {
        kind.decode(self.cell(table, row, column)?)
    }

    /// Rows of `target` owned by `row`, per the list column `column` of `table`.
    fn list_range(
        &self,
        table: TableId,
        row: u32,
        column: usize,
        target: TableId,
    ) -> Result<Range<u32>, ClrMetadataError> {
        let limit = self.row_count(target) + 1;

        let start = self.cell(table, row, column)?.clamp(1, limit);
        let end = if row < self.row_count(table) {
            self.cell(table, row + 1, column)?.clamp(1, limit)
        } else {
            limit
        };

        Ok(start..end.max(start))
    }

    /// The assembly name, if this module carries an assembly manifest.
    pub fn name(&self) -> Result<Option<String>, ClrMetadataError> {
        if self.row_count(TableId::Assembly) == 0 {
            Ok(None)
        } else {
            Ok(Some(self.string(TableId::Assembly, 1, 7)?))
        }
    }

    /// The module name, usually the file name.
    pub fn module_name(&self) -> Result<String, ClrMetadataError> {
        self.string(TableId::Module, 1, 1)
    }

    pub fn assembly_references(&self) -> Result<Vec<AssemblyReference>, ClrMetadataError> {
        (1..=self.row_count(TableId::AssemblyRef))
            .map(|row| {
                let mut version = [0u16; 4];
                for (i, v) in version.iter_mut().enumerate() {
                    *v = self.cell(TableId::AssemblyRef, row, i)? as u16;
                }

                Ok(AssemblyReference {
                    token: MetadataToken::new(TableId::AssemblyRef, row),
                    name: self.string(TableId::AssemblyRef, row, 6)?,
                    culture: self.string(TableId::AssemblyRef, row, 7)?,
                    version,
                })
            })
            .collect()
    }

    pub fn type_reference(&self, row: u32) -> Result<TypeReference, ClrMetadataError> {
        self.type_reference_at_depth(row, 0)
    }

    fn type_reference_at_depth(
        &self,
        row: u32,
        depth: usize,
    ) -> Result<TypeReference, ClrMetadataError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(ClrMetadataError::TypeReferenceDepth);
        }

        let name = self.string(TableId::TypeRef, row, 1)?;
        let namespace = self.string(TableId::TypeRef, row, 2)?;
        let token = MetadataToken::new(TableId::TypeRef, row);

        let scope = self.coded(TableId::TypeRef, row, 0, CodedIndex::ResolutionScope)?;

        let (name, scope) = match scope {
            Some(MetadataToken {
                table: TableId::TypeRef,
                row: enclosing,
            }) => {
                let enclosing = self.type_reference_at_depth(enclosing, depth + 1)?;
                (enclosing.name.nested(name), enclosing.scope)
            }
            Some(MetadataToken {
                table: TableId::AssemblyRef,
                row,
            }) => (
                TypeName::new(namespace, name),
                TypeScope::Assembly(self.string(TableId::AssemblyRef, row, 6)?),
            ),
            Some(MetadataToken {
                table: TableId::ModuleRef,
                row,
            }) => (
                TypeName::new(namespace, name),
                TypeScope::ModuleReference(self.string(TableId::ModuleRef, row, 0)?),
            ),
            Some(_) => (TypeName::new(namespace, name), TypeScope::CurrentModule),
            None => (TypeName::new(namespace, name), TypeScope::Exported),
        };

        Ok(TypeReference { token, name, scope })
    }

    /// All rows of the `TypeRef` table.
    pub fn type_references(&self) -> Result<Vec<TypeReference>, ClrMetadataError> {
        (1..=self.row_count(TableId::TypeRef))
            .map(|row| self.type_reference(row))
            .collect()
    }

    fn member_parent(&self, token: MetadataToken) -> Result<MemberParent, ClrMetadataError> {
        Ok(match token.table {
            TableId::TypeRef => MemberParent::TypeReference(self.type_reference(token.row)?),
            TableId::TypeDef => MemberParent::TypeDefinition(token),
            TableId::ModuleRef => {
                MemberParent::ModuleReference(self.string(TableId::ModuleRef, token.row, 0)?)
            }
            TableId::MethodDef => MemberParent::MethodDefinition(token),
            _ => match parse_type_spec(self.blob(TableId::TypeSpec, token.row, 0)?) {
                Ok(SigType::GenericInstance { generic_type, .. })
                    if generic_type.table == TableId::TypeRef =>
                {
                    MemberParent::TypeReference(self.type_reference(generic_type.row)?)
                }
                Ok(SigType::GenericInstance { generic_type, .. })
                    if generic_type.table == TableId::TypeDef =>
                {
                    MemberParent::TypeDefinition(generic_type)
                }
                Ok(_) => MemberParent::TypeSpecification(token),
                Err(e) => {
                    debug!("unable to parse type specification {}: {}", token, e);
                    MemberParent::TypeSpecification(token)
                }
            },
        })
    }

    pub fn member_reference(&self, row: u32) -> Result<MemberReference, ClrMetadataError> {
        let parent = self
            .coded(TableId::MemberRef, row, 0, CodedIndex::MemberRefParent)?
            .ok_or(ClrMetadataError::RowOutOfRange {
                table: TableId::MemberRef,
                row,
            })?;

        Ok(MemberReference {
            token: MetadataToken::new(TableId::MemberRef, row),
            name: self.string(TableId::MemberRef, row, 1)?,
            parent: self.member_parent(parent)?,
            signature_blob: self.blob(TableId::MemberRef, row, 2)?.to_vec(),
        })
    }

    /// All rows of the `MemberRef` table.
    pub fn member_references(&self) -> Result<Vec<MemberReference>, ClrMetadataError> {
        (1..=self.row_count(TableId::MemberRef))
            .map(|row| self.member_reference(row))
            .collect()
    }

    fn enclosing_types(&self) -> Result<&HashMap<u32, u32>, ClrMetadataError> {
        self.enclosing_types.get_or_try_init(|| {
            (1..=self.row_count(TableId::NestedClass))
                .map(|row| {
                    Ok((
                        self.cell(TableId::NestedClass, row, 0)?,
                        self.cell(TableId::NestedClass, row, 1)?,
                    ))
                })
                .collect()
        })
    }

    /// The full name of a type definition.
    pub fn type_name(&self, row: u32) -> Result<TypeName, ClrMetadataError> {
        let mut chain = vec![row];

        while let Some(enclosing) = self.enclosing_types()?.get(chain.last().unwrap_or(&row)) {
            if chain.len() > MAX_NESTING_DEPTH {
                return Err(ClrMetadataError::TypeReferenceDepth);
            }
            chain.push(*enclosing);
        }

        let mut rows = chain.into_iter().rev();
        let outermost = rows.next().unwrap_or(row);

        let mut name = TypeName::new(
            self.string(TableId::TypeDef, outermost, 2)?,
            self.string(TableId::TypeDef, outermost, 1)?,
        );
        for nested in rows {
            name = name.nested(self.string(TableId::TypeDef, nested, 1)?);
        }

        Ok(name)
    }

    pub fn type_definition(&self, row: u32) -> Result<TypeDefinition, ClrMetadataError> {
        Ok(TypeDefinition {
            token: MetadataToken::new(TableId::TypeDef, row),
            flags: self.cell(TableId::TypeDef, row, 0)?,
            name: self.type_name(row)?,
            extends: self.coded(TableId::TypeDef, row, 3, CodedIndex::TypeDefOrRef)?,
        })
    }

    /// All rows of the `TypeDef` table, including the `<Module>` pseudo type.
    pub fn type_definitions(&self) -> Result<Vec<TypeDefinition>, ClrMetadataError> {
        (1..=self.row_count(TableId::TypeDef))
            .map(|row| self.type_definition(row))
            .collect()
    }

    fn type_index(&self) -> Result<&HashMap<TypeIndexKey, u32>, ClrMetadataError> {
        self.type_index.get_or_try_init(|| {
            let enclosing = self.enclosing_types()?;

            (1..=self.row_count(TableId::TypeDef))
                .map(|row| {
                    let name = self.string(TableId::TypeDef, row, 1)?;

                    Ok(match enclosing.get(&row) {
                        Some(outer) => ((Some(*outer), String::new(), name), row),
                        None => (
                            (None, self.string(TableId::TypeDef, row, 2)?, name),
                            row,
                        ),
                    })
                })
                .collect()
        })
    }

    /// Find a type definition by name.
    pub fn find_type(&self, name: &TypeName) -> Result<Option<MetadataToken>, ClrMetadataError> {
        let index = self.type_index()?;

        let mut path = name.path();
        let mut current = match path.next() {
            Some(outermost) => {
                match index.get(&(None, name.namespace.clone(), outermost.to_string())) {
                    Some(row) => *row,
                    None => return Ok(None),
                }
            }
            None => return Ok(None),
        };

        for nested in path {
            current = match index.get(&(Some(current), String::new(), nested.to_string())) {
                Some(row) => *row,
                None => return Ok(None),
            };
        }

        Ok(Some(MetadataToken::new(TableId::TypeDef, current)))
    }

    fn method_definition(&self, row: u32) -> Result<MethodDefinition, ClrMetadataError> {
        Ok(MethodDefinition {
            token: MetadataToken::new(TableId::MethodDef, row),
            name: self.string(TableId::MethodDef, row, 3)?,
            flags: self.cell(TableId::MethodDef, row, 2)? as u16,
            signature_blob: self.blob(TableId::MethodDef, row, 4)?.to_vec(),
        })
    }

    /// Methods declared by a type definition.
    pub fn methods(&self, type_row: u32) -> Result<Vec<MethodDefinition>, ClrMetadataError> {
        self.list_range(TableId::TypeDef, type_row, 5, TableId::MethodDef)?
            .map(|row| self.method_definition(row))
            .collect()
    }

    /// Fields declared by a type definition.
    pub fn fields(&self, type_row: u32) -> Result<Vec<FieldDefinition>, ClrMetadataError> {
        self.list_range(TableId::TypeDef, type_row, 4, TableId::Field)?
            .map(|row| {
                Ok(FieldDefinition {
                    token: MetadataToken::new(TableId::Field, row),
                    name: self.string(TableId::Field, row, 1)?,
                    flags: self.cell(TableId::Field, row, 0)? as u16,
                    signature_blob: self.blob(TableId::Field, row, 2)?.to_vec(),
                })
            })
            .collect()
    }

    /// Properties declared by a type definition.
    pub fn properties(&self, type_row: u32) -> Result<Vec<PropertyDefinition>, ClrMetadataError> {
        for map_row in 1..=self.row_count(TableId::PropertyMap) {
            if self.cell(TableId::PropertyMap, map_row, 0)? != type_row {
                continue;
            }

            return self
                .list_range(TableId::PropertyMap, map_row, 1, TableId::Property)?
                .map(|row| {
                    Ok(PropertyDefinition {
                        token: MetadataToken::new(TableId::Property, row),
                        name: self.string(TableId::Property, row, 1)?,
                        flags: self.cell(TableId::Property, row, 0)? as u16,
                    })
                })
                .collect();
        }

        Ok(vec![])
    }

    fn method_owners(&self) -> Result<&Vec<u32>, ClrMetadataError> {
        self.method_owners.get_or_try_init(|| {
            let mut owners = vec![0; self.row_count(TableId::MethodDef) as usize];

            for type_row in 1..=self.row_count(TableId::TypeDef) {
                for method in self.list_range(TableId::TypeDef, type_row, 5, TableId::MethodDef)? {
                    owners[method as usize - 1] = type_row;
                }
            }

            Ok(owners)
        })
    }

    /// The type definition declaring a method.
    pub fn method_owner(&self, method_row: u32) -> Result<Option<u32>, ClrMetadataError> {
        Ok(self
            .method_owners()?
            .get((method_row as usize).wrapping_sub(1))
            .copied()
            .filter(|row| *row != 0))
    }

    fn attribute_index(&self) -> Result<&HashMap<MetadataToken, Vec<u32>>, ClrMetadataError> {
        self.attribute_index.get_or_try_init(|| {
            let mut index: HashMap<MetadataToken, Vec<u32>> = HashMap::new();

            for row in 1..=self.row_count(TableId::CustomAttribute) {
                if let Some(parent) = self.coded(
                    TableId::CustomAttribute,
                    row,
                    0,
                    CodedIndex::HasCustomAttribute,
                )? {
                    index.entry(parent).or_default().push(row);
                }
            }

            Ok(index)
        })
    }

    /// Custom attributes attached to a declaration.
    pub fn custom_attributes(
        &self,
        parent: MetadataToken,
    ) -> Result<Vec<CustomAttribute>, ClrMetadataError> {
        let rows = match self.attribute_index()?.get(&parent) {
            Some(rows) => rows,
            None => return Ok(vec![]),
        };

        rows.iter()
            .map(|row| {
                let constructor = self
                    .coded(
                        TableId::CustomAttribute,
                        *row,
                        1,
                        CodedIndex::CustomAttributeType,
                    )?
                    .ok_or(ClrMetadataError::RowOutOfRange {
                        table: TableId::CustomAttribute,
                        row: *row,
                    })?;

                Ok(CustomAttribute {
                    token: MetadataToken::new(TableId::CustomAttribute, *row),
                    parent,
                    constructor,
                    value: self.blob(TableId::CustomAttribute, *row, 2)?.to_vec(),
                })
            })
            .collect()
    }

    /// The type an attribute constructor belongs to.
    pub fn attribute_type(
        &self,
        attribute: &CustomAttribute,
    ) -> Result<Option<TypeName>, ClrMetadataError> {
        let constructor = attribute.constructor;

        match constructor.table {
            TableId::MethodDef => match self.method_owner(constructor.row)? {
                Some(owner) => Ok(Some(self.type_name(owner)?)),
                None => Ok(None),
            },
            TableId::MemberRef => match self.member_reference(constructor.row)?.parent {
                MemberParent::TypeReference(r) => Ok(Some(r.name)),
                MemberParent::TypeDefinition(t) => Ok(Some(self.type_name(t.row)?)),
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    fn constructor_signature(
        &self,
        constructor: MetadataToken,
    ) -> Result<MethodSignature, ClrMetadataError> {
        let blob = match constructor.table {
            TableId::MethodDef => self.blob(TableId::MethodDef, constructor.row, 4)?,
            _ => self.blob(TableId::MemberRef, constructor.row, 2)?,
        };

        parse_method_signature(blob)
    }

    /// Decode the constructor arguments of an attribute.
    pub fn attribute_arguments(
        &self,
        attribute: &CustomAttribute,
    ) -> Result<Vec<AttributeValue>, ClrMetadataError> {
        self.attribute_arguments_with(attribute, self)
    }

    /// Decode the constructor arguments of an attribute, resolving types through `resolver`.
    pub fn attribute_arguments_with(
        &self,
        attribute: &CustomAttribute,
        resolver: &dyn AttributeTypeResolver,
    ) -> Result<Vec<AttributeValue>, ClrMetadataError> {
        let constructor = self.constructor_signature(attribute.constructor)?;

        decode_fixed_arguments(&attribute.value, &constructor, resolver)
    }

    /// The underlying type of an enum defined in this module.
    fn enum_definition_underlying_type(&self, type_row: u32) -> Result<Option<u8>, ClrMetadataError> {
        for field in self.fields(type_row)? {
            if field.is_static() {
                continue;
            }

            return Ok(match field.field_type()? {
                SigType::Primitive(element) => Some(element),
                _ => None,
            });
        }

        Ok(None)
    }
}

impl AttributeTypeResolver for Assembly {
    fn is_system_type(&self, token: MetadataToken) -> Result<bool, ClrMetadataError> {
        Ok(match token.table {
            TableId::TypeRef => self.type_reference(token.row)?.name.is("System", "Type"),
            TableId::TypeDef => self.type_name(token.row)?.is("System", "Type"),
            _ => false,
        })
    }

    fn enum_underlying_type(&self, token: MetadataToken) -> Result<Option<u8>, ClrMetadataError> {
        match token.table {
            TableId::TypeDef => self.enum_definition_underlying_type(token.row),
            TableId::TypeRef => {
                let reference = self.type_reference(token.row)?;

                if reference.scope != TypeScope::CurrentModule {
                    return Ok(None);
                }

                match self.find_type(&reference.name)? {
                    Some(definition) => self.enum_definition_underlying_type(definition.row),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            builder::AssemblyBuilder,
            signature::{ELEMENT_TYPE_I4, ELEMENT_TYPE_STRING, ELEMENT_TYPE_U1, ELEMENT_TYPE_VOID},
        },
    };

    #[test]
    fn type_name_display() {
        let outer = TypeName::new("AppKit", "NSView");
        assert_eq!(outer.to_string(), "AppKit.NSView");

        let inner = outer.nested("Notifications").nested("Observer");
        assert_eq!(inner.to_string(), "AppKit.NSView/Notifications/Observer");
        assert_eq!(
            inner.path().collect::<Vec<_>>(),
            vec!["NSView", "Notifications", "Observer"]
        );
        assert!(outer.is("AppKit", "NSView"));
        assert!(!inner.is("AppKit", "Observer"));

        assert_eq!(TypeName::new("", "Program").to_string(), "Program");
    }

    /// A console program emitted by a C# compiler for the 1.1 runtime.
    const CSHARP_EXE: &[u8] = include_bytes!("testdata/csharpexec-test.exe");

    #[test]
    fn compiler_output() -> Result<(), ClrMetadataError> {
        let assembly = Assembly::from_pe_bytes(CSHARP_EXE.to_vec())?;

        assert_eq!(assembly.runtime_version(), "v1.1.4322");
        assert_eq!(assembly.name()?.as_deref(), Some("csharpexec-test"));
        assert_eq!(assembly.module_name()?, "csharpexec-test.exe");
        assert_eq!(assembly.row_count(TableId::CustomAttribute), 0);

        let references = assembly.assembly_references()?;
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].name, "mscorlib");
        assert_eq!(references[0].culture, "");
        assert_eq!(references[0].version, [1, 2, 3400, 0]);

        let object = TypeReference {
            token: MetadataToken::new(TableId::TypeRef, 1),
            name: TypeName::new("System", "Object"),
            scope: TypeScope::Assembly("mscorlib".into()),
        };
        assert_eq!(assembly.type_references()?, vec![object.clone()]);

        let members = assembly.member_references()?;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, ".ctor");
        assert_eq!(members[0].parent, MemberParent::TypeReference(object));
        assert_eq!(
            members[0].signature()?,
            MemberSignature::Method(MethodSignature {
                has_this: true,
                generic_parameter_count: 0,
                return_type: SigType::Primitive(ELEMENT_TYPE_VOID),
                parameters: vec![],
            })
        );

        let types = assembly.type_definitions()?;
        assert_eq!(
            types.iter().map(|t| t.name.to_string()).collect::<Vec<_>>(),
            vec!["<Module>", "ConfTest"]
        );
        assert_eq!(types[0].extends, None);
        assert_eq!(
            types[1].extends,
            Some(MetadataToken::new(TableId::TypeRef, 1))
        );

        let conf_test = assembly
            .find_type(&TypeName::new("", "ConfTest"))?
            .expect("ConfTest is defined");
        assert_eq!(conf_test, MetadataToken::new(TableId::TypeDef, 2));
        assert!(assembly.methods(1)?.is_empty());

        let methods = assembly.methods(conf_test.row)?;
        assert_eq!(
            methods.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            vec!["Main", ".ctor"]
        );
        assert!(!methods[0].signature()?.has_this);
        assert!(methods[1].signature()?.has_this);
        assert_eq!(assembly.method_owner(1)?, Some(2));
        assert!(assembly.properties(conf_test.row)?.is_empty());
        assert!(assembly.custom_attributes(conf_test)?.is_empty());

        assert_eq!(assembly.find_type(&TypeName::new("System", "Object"))?, None);

        Ok(())
    }

    #[test]
    fn not_managed() {
        assert!(Assembly::from_pe_bytes(b"MZ but nothing else".to_vec()).is_err());
    }

    #[test]
    fn definitions_round_trip() -> Result<(), ClrMetadataError> {
        let mut builder = AssemblyBuilder::new("Platform");
        builder.add_type("AppKit", "NSView")?;
        builder.add_method("get_Frame", &[], ELEMENT_TYPE_I4)?;
        builder.add_method("Draw", &[ELEMENT_TYPE_I4], ELEMENT_TYPE_VOID)?;
        builder.add_property("Frame")?;
        builder.add_nested_type("Notifications")?;
        builder.add_method("Observe", &[ELEMENT_TYPE_STRING], ELEMENT_TYPE_VOID)?;
        builder.add_type("AppKit", "NSWindow")?;
        builder.add_field("handle", ELEMENT_TYPE_I4, false)?;

        let assembly = Assembly::from_pe_bytes(builder.to_pe_bytes()?)?;

        assert_eq!(assembly.name()?.as_deref(), Some("Platform"));
        assert_eq!(assembly.module_name()?, "Platform.dll");
        assert_eq!(assembly.runtime_version(), "v4.0.30319");

        let view = assembly
            .find_type(&TypeName::new("AppKit", "NSView"))?
            .expect("NSView present");
        let methods = assembly.methods(view.row)?;
        assert_eq!(
            methods.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            vec!["get_Frame", "Draw"]
        );
        assert_eq!(methods[1].signature()?.parameters.len(), 1);
        assert_eq!(
            assembly
                .properties(view.row)?
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>(),
            vec!["Frame"]
        );

        let nested_name = TypeName::new("AppKit", "NSView").nested("Notifications");
        let nested = assembly.find_type(&nested_name)?.expect("nested type present");
        assert_eq!(assembly.type_name(nested.row)?, nested_name);
        assert_eq!(assembly.methods(nested.row)?[0].name, "Observe");
        assert!(assembly.properties(nested.row)?.is_empty());
        assert_eq!(assembly.find_type(&TypeName::new("", "Notifications"))?, None);

        let window = assembly
            .find_type(&TypeName::new("AppKit", "NSWindow"))?
            .expect("NSWindow present");
        assert!(assembly.methods(window.row)?.is_empty());
        let fields = assembly.fields(window.row)?;
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "handle");
        assert_eq!(fields[0].field_type()?, SigType::Primitive(ELEMENT_TYPE_I4));

        assert_eq!(assembly.find_type(&TypeName::new("AppKit", "NSButton"))?, None);

        let names = assembly
            .type_definitions()?
            .into_iter()
            .map(|t| t.name.to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["<Module>", "AppKit.NSView", "AppKit.NSView/Notifications", "AppKit.NSWindow"]
        );

        Ok(())
    }

    #[test]
    fn references_round_trip() -> Result<(), ClrMetadataError> {
        let mut builder = AssemblyBuilder::new("App");
        let platform = builder.add_assembly_ref("Platform")?;
        let view = builder.add_type_ref(platform, "AppKit", "NSView")?;
        let nested = builder.add_nested_type_ref(view, "Notifications")?;
        let list = builder.add_type_ref(platform, "Foundation", "NSList`1")?;
        let list_of_int = builder.add_generic_instance(list, &[ELEMENT_TYPE_I4])?;
        builder.add_member_ref(view, "Draw", &[ELEMENT_TYPE_I4], ELEMENT_TYPE_VOID)?;
        builder.add_member_ref(list_of_int, "Add", &[ELEMENT_TYPE_I4], ELEMENT_TYPE_VOID)?;
        builder.add_field_ref(nested, "Key", ELEMENT_TYPE_STRING)?;

        let assembly = Assembly::from_pe_bytes(builder.to_pe_bytes()?)?;

        let references = assembly.assembly_references()?;
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].name, "Platform");

        let types = assembly.type_references()?;
        assert_eq!(types.len(), 3);
        assert_eq!(types[0].name, TypeName::new("AppKit", "NSView"));
        assert_eq!(types[0].assembly_name(), Some("Platform"));
        assert_eq!(types[1].name, TypeName::new("AppKit", "NSView").nested("Notifications"));
        assert_eq!(types[1].assembly_name(), Some("Platform"));

        let members = assembly.member_references()?;
        assert_eq!(members.len(), 3);

        assert_eq!(members[0].name, "Draw");
        assert_eq!(
            members[0].parent.type_reference().map(|r| r.name.to_string()),
            Some("AppKit.NSView".to_string())
        );
        assert!(matches!(members[0].signature()?, MemberSignature::Method(_)));

        // Members of generic instantiations belong to the generic type.
        assert_eq!(
            members[1].parent.type_reference().map(|r| r.name.to_string()),
            Some("Foundation.NSList`1".to_string())
        );

        assert_eq!(members[2].name, "Key");
        assert!(matches!(members[2].signature()?, MemberSignature::Field(_)));

        Ok(())
    }

    #[test]
    fn attributes_round_trip() -> Result<(), ClrMetadataError> {
        let mut builder = AssemblyBuilder::new("Platform");
        let platform_name = builder.add_enum("ObjCRuntime", "PlatformName", ELEMENT_TYPE_U1)?;
        let introduced = builder.add_attribute_type(
            "ObjCRuntime",
            "IntroducedAttribute",
            &[
                SigType::ValueType(platform_name),
                SigType::Primitive(ELEMENT_TYPE_I4),
                SigType::Primitive(ELEMENT_TYPE_I4),
            ],
        )?;
        let view = builder.add_type("AppKit", "NSView")?;
        let draw = builder.add_method("Draw", &[], ELEMENT_TYPE_VOID)?;
        builder.add_custom_attribute(
            view,
            introduced,
            &[
                AttributeValue::UInt(1),
                AttributeValue::Int(10),
                AttributeValue::Int(9),
            ],
        )?;
        builder.add_custom_attribute(
            draw,
            introduced,
            &[
                AttributeValue::UInt(1),
                AttributeValue::Int(10),
                AttributeValue::Int(12),
            ],
        )?;

        let assembly = Assembly::from_pe_bytes(builder.to_pe_bytes()?)?;

        let view = assembly
            .find_type(&TypeName::new("AppKit", "NSView"))?
            .expect("NSView present");
        let attributes = assembly.custom_attributes(view)?;
        assert_eq!(attributes.len(), 1);
        assert_eq!(
            assembly.attribute_type(&attributes[0])?,
            Some(TypeName::new("ObjCRuntime", "IntroducedAttribute"))
        );
        assert_eq!(
            assembly.attribute_arguments(&attributes[0])?,
            vec![
                AttributeValue::UInt(1),
                AttributeValue::Int(10),
                AttributeValue::Int(9),
            ]
        );

        let draw = assembly.methods(view.row)?[0].token;
        let attributes = assembly.custom_attributes(draw)?;
        assert_eq!(attributes.len(), 1);
        assert_eq!(
            assembly.attribute_arguments(&attributes[0])?[2],
            AttributeValue::Int(12)
        );

        let window = MetadataToken::new(TableId::TypeDef, 42);
        assert!(assembly.custom_attributes(window)?.is_empty());

        Ok(())
    }
}
