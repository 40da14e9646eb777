// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Writing minimal managed modules.

[AssemblyBuilder] emits a PE32 image containing a single `.text` section
holding a CLI header and metadata. There is no IL: methods have an RVA of
0. The output is only meant to be read back by metadata readers, which is
what test suites fabricating bundles need.

Declarations attach to the most recently added type definition, so
members of a type must be added before the next type is started.
*/

use {
    crate::{
        heaps::write_compressed_u32,
        pe::{CliHeader, METADATA_SIGNATURE},
        signature::{
            AttributeValue, SigType, ELEMENT_TYPE_BOOLEAN, ELEMENT_TYPE_CHAR,
            ELEMENT_TYPE_CLASS, ELEMENT_TYPE_GENERICINST, ELEMENT_TYPE_I1, ELEMENT_TYPE_I2,
            ELEMENT_TYPE_I4, ELEMENT_TYPE_I8, ELEMENT_TYPE_OBJECT, ELEMENT_TYPE_R4,
            ELEMENT_TYPE_R8, ELEMENT_TYPE_STRING, ELEMENT_TYPE_SZARRAY, ELEMENT_TYPE_U1,
            ELEMENT_TYPE_U2, ELEMENT_TYPE_U4, ELEMENT_TYPE_U8, ELEMENT_TYPE_VALUETYPE,
            ELEMENT_TYPE_VOID, CALLING_CONVENTION_FIELD, CALLING_CONVENTION_HAS_THIS,
            CALLING_CONVENTION_PROPERTY, SERIALIZATION_TYPE_TYPE,
        },
        tables::{
            CodedIndex, MetadataToken, TableId, TableLayout, HEAP_SIZE_WIDE_BLOBS,
            HEAP_SIZE_WIDE_STRINGS, TABLE_COUNT,
        },
        ClrMetadataError,
    },
    scroll::IOwrite,
    std::{collections::HashMap, path::Path},
};

const PE_HEADER_OFFSET: u32 = 0x80;
const FILE_ALIGNMENT: u32 = 0x200;
const SECTION_ALIGNMENT: u32 = 0x2000;
const TEXT_RVA: u32 = 0x2000;
const CLI_HEADER_SIZE: u32 = 72;
const CLR_DIRECTORY_INDEX: usize = 14;
const COMIMAGE_FLAGS_ILONLY: u32 = 0x1;
const RUNTIME_VERSION: &[u8; 12] = b"v4.0.30319\0\0";

const TYPE_PUBLIC: u32 = 0x0000_0001;
const TYPE_NESTED_PUBLIC: u32 = 0x0000_0002;
const TYPE_SEALED: u32 = 0x0000_0100;
const TYPE_BEFORE_FIELD_INIT: u32 = 0x0010_0000;
const METHOD_PUBLIC_HIDE_BY_SIG: u32 = 0x0086;
const METHOD_CONSTRUCTOR: u32 = 0x1886;
const FIELD_PUBLIC: u32 = 0x0006;
const FIELD_STATIC: u32 = 0x0010;
const FIELD_ENUM_VALUE: u32 = 0x0606;

fn align(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

fn pad4(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}

fn write_type_def_or_ref(dest: &mut Vec<u8>, token: MetadataToken) -> Result<(), ClrMetadataError> {
    let tag = match token.table {
        TableId::TypeDef => 0,
        TableId::TypeRef => 1,
        TableId::TypeSpec => 2,
        _ => {
            return Err(ClrMetadataError::UnencodableToken {
                kind: CodedIndex::TypeDefOrRef,
                token,
            })
        }
    };

    write_compressed_u32(dest, (token.row << 2) | tag)
}

fn write_type(dest: &mut Vec<u8>, ty: &SigType) -> Result<(), ClrMetadataError> {
    match ty {
        SigType::Primitive(element) => dest.push(*element),
        SigType::String => dest.push(ELEMENT_TYPE_STRING),
        SigType::Object => dest.push(ELEMENT_TYPE_OBJECT),
        SigType::Class(token) => {
            dest.push(ELEMENT_TYPE_CLASS);
            write_type_def_or_ref(dest, *token)?;
        }
        SigType::ValueType(token) => {
            dest.push(ELEMENT_TYPE_VALUETYPE);
            write_type_def_or_ref(dest, *token)?;
        }
        SigType::SzArray(element) => {
            dest.push(ELEMENT_TYPE_SZARRAY);
            write_type(dest, element)?;
        }
        SigType::GenericInstance {
            generic_type,
            arguments,
        } => {
            dest.extend_from_slice(&[ELEMENT_TYPE_GENERICINST, ELEMENT_TYPE_CLASS]);
            write_type_def_or_ref(dest, *generic_type)?;
            write_compressed_u32(dest, arguments.len() as u32)?;
            for argument in arguments {
                write_type(dest, argument)?;
            }
        }
        SigType::Other(_) => return Err(ClrMetadataError::BadSignature("type cannot be encoded")),
    }

    Ok(())
}

fn method_signature(
    has_this: bool,
    parameters: &[SigType],
    return_type: &SigType,
) -> Result<Vec<u8>, ClrMetadataError> {
    let mut sig = vec![if has_this { CALLING_CONVENTION_HAS_THIS } else { 0 }];
    write_compressed_u32(&mut sig, parameters.len() as u32)?;
    write_type(&mut sig, return_type)?;
    for parameter in parameters {
        write_type(&mut sig, parameter)?;
    }

    Ok(sig)
}

fn primitives(elements: &[u8]) -> Vec<SigType> {
    elements.iter().map(|e| SigType::Primitive(*e)).collect()
}

fn value_mismatch(value: &AttributeValue, ty: &str) -> ClrMetadataError {
    ClrMetadataError::BadAttributeValue(format!("{:?} cannot be written as {}", value, ty))
}

fn write_ser_string(dest: &mut Vec<u8>, value: Option<&str>) -> Result<(), ClrMetadataError> {
    match value {
        Some(s) => {
            write_compressed_u32(dest, s.len() as u32)?;
            dest.extend_from_slice(s.as_bytes());
        }
        None => dest.push(0xff),
    }

    Ok(())
}

fn write_primitive_value(
    dest: &mut Vec<u8>,
    element: u8,
    value: &AttributeValue,
) -> Result<(), ClrMetadataError> {
    let integer = || value.as_i64().ok_or_else(|| value_mismatch(value, "an integer"));

    match (element, value) {
        (ELEMENT_TYPE_BOOLEAN, AttributeValue::Bool(v)) => dest.iowrite_with(*v as u8, scroll::LE)?,
        (ELEMENT_TYPE_CHAR, AttributeValue::Char(v)) => dest.iowrite_with(*v, scroll::LE)?,
        (ELEMENT_TYPE_I1, _) => dest.iowrite_with(integer()? as i8, scroll::LE)?,
        (ELEMENT_TYPE_U1, _) => dest.iowrite_with(integer()? as u8, scroll::LE)?,
        (ELEMENT_TYPE_I2, _) => dest.iowrite_with(integer()? as i16, scroll::LE)?,
        (ELEMENT_TYPE_U2, _) => dest.iowrite_with(integer()? as u16, scroll::LE)?,
        (ELEMENT_TYPE_I4, _) => dest.iowrite_with(integer()? as i32, scroll::LE)?,
        (ELEMENT_TYPE_U4, _) => dest.iowrite_with(integer()? as u32, scroll::LE)?,
        (ELEMENT_TYPE_I8, _) => dest.iowrite_with(integer()?, scroll::LE)?,
        (ELEMENT_TYPE_U8, _) => dest.iowrite_with(integer()? as u64, scroll::LE)?,
        (ELEMENT_TYPE_R4, AttributeValue::Float(v)) => dest.iowrite_with(*v as f32, scroll::LE)?,
        (ELEMENT_TYPE_R8, AttributeValue::Float(v)) => dest.iowrite_with(*v, scroll::LE)?,
        (ELEMENT_TYPE_STRING, AttributeValue::String(v)) => write_ser_string(dest, v.as_deref())?,
        _ => return Err(value_mismatch(value, &format!("element type {:#x}", element))),
    }

    Ok(())
}

/// Builds a managed module in memory.
#[derive(Clone)]
pub struct AssemblyBuilder {
    assembly_name: Option<String>,
    module_name: String,
    strings: Vec<u8>,
    string_offsets: HashMap<String, u32>,
    blobs: Vec<u8>,
    blob_offsets: HashMap<Vec<u8>, u32>,
    rows: Vec<Vec<Vec<u32>>>,
    current_type: u32,
    enums: HashMap<MetadataToken, u8>,
    constructors: HashMap<MetadataToken, Vec<SigType>>,
    core_library: Option<MetadataToken>,
    core_types: HashMap<&'static str, MetadataToken>,
}

impl AssemblyBuilder {
    /// A module carrying an assembly manifest named `assembly_name`.
    pub fn new(assembly_name: &str) -> Self {
        let mut builder = Self::module_only(&format!("{}.dll", assembly_name));
        builder.assembly_name = Some(assembly_name.to_string());

        builder
    }

    /// A module without an assembly manifest.
    pub fn module_only(module_name: &str) -> Self {
        let mut builder = Self {
            assembly_name: None,
            module_name: module_name.to_string(),
            strings: vec![0],
            string_offsets: HashMap::new(),
            blobs: vec![0],
            blob_offsets: HashMap::new(),
            rows: vec![vec![]; TABLE_COUNT],
            current_type: 1,
            enums: HashMap::new(),
            constructors: HashMap::new(),
            core_library: None,
            core_types: HashMap::new(),
        };

        let name = builder.string("<Module>");
        builder.push_row(TableId::TypeDef, vec![0, name, 0, 0, 1, 1]);

        builder
    }

    fn string(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }

        if let Some(offset) = self.string_offsets.get(value) {
            return *offset;
        }

        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        self.string_offsets.insert(value.to_string(), offset);

        offset
    }

    fn blob(&mut self, value: &[u8]) -> Result<u32, ClrMetadataError> {
        if value.is_empty() {
            return Ok(0);
        }

        if let Some(offset) = self.blob_offsets.get(value) {
            return Ok(*offset);
        }

        let offset = self.blobs.len() as u32;
        write_compressed_u32(&mut self.blobs, value.len() as u32)?;
        self.blobs.extend_from_slice(value);
        self.blob_offsets.insert(value.to_vec(), offset);

        Ok(offset)
    }

    fn row_count(&self, table: TableId) -> u32 {
        self.rows[table as usize].len() as u32
    }

    fn push_row(&mut self, table: TableId, values: Vec<u32>) -> MetadataToken {
        self.rows[table as usize].push(values);

        MetadataToken::new(table, self.row_count(table))
    }

    fn coded(kind: CodedIndex, token: MetadataToken) -> Result<u32, ClrMetadataError> {
        kind.encode(token)
            .ok_or(ClrMetadataError::UnencodableToken { kind, token })
    }

    fn core_type(&mut self, name: &'static str) -> Result<MetadataToken, ClrMetadataError> {
        if let Some(token) = self.core_types.get(name) {
            return Ok(*token);
        }

        let library = match self.core_library {
            Some(token) => token,
            None => {
                let token = self.add_assembly_ref("mscorlib")?;
                self.core_library = Some(token);
                token
            }
        };

        let token = self.add_type_ref(library, "System", name)?;
        self.core_types.insert(name, token);

        Ok(token)
    }

    /// Reference another assembly by name.
    pub fn add_assembly_ref(&mut self, name: &str) -> Result<MetadataToken, ClrMetadataError> {
        let name = self.string(name);

        Ok(self.push_row(TableId::AssemblyRef, vec![1, 0, 0, 0, 0, 0, name, 0, 0]))
    }

    /// Reference a type. `scope` is an `AssemblyRef`, `ModuleRef` or enclosing `TypeRef`.
    pub fn add_type_ref(
        &mut self,
        scope: MetadataToken,
        namespace: &str,
        name: &str,
    ) -> Result<MetadataToken, ClrMetadataError> {
        let scope = Self::coded(CodedIndex::ResolutionScope, scope)?;
        let name = self.string(name);
        let namespace = self.string(namespace);

        Ok(self.push_row(TableId::TypeRef, vec![scope, name, namespace]))
    }

    /// Reference a type nested in a referenced type.
    pub fn add_nested_type_ref(
        &mut self,
        enclosing: MetadataToken,
        name: &str,
    ) -> Result<MetadataToken, ClrMetadataError> {
        self.add_type_ref(enclosing, "", name)
    }

    /// Add a `TypeSpec` instantiating a generic class with primitive arguments.
    pub fn add_generic_instance(
        &mut self,
        generic_type: MetadataToken,
        arguments: &[u8],
    ) -> Result<MetadataToken, ClrMetadataError> {
        let mut sig = vec![];
        write_type(
            &mut sig,
            &SigType::GenericInstance {
                generic_type,
                arguments: primitives(arguments),
            },
        )?;
        let sig = self.blob(&sig)?;

        Ok(self.push_row(TableId::TypeSpec, vec![sig]))
    }

    fn add_member_ref_with_signature(
        &mut self,
        parent: MetadataToken,
        name: &str,
        sig: &[u8],
    ) -> Result<MetadataToken, ClrMetadataError> {
        let parent = Self::coded(CodedIndex::MemberRefParent, parent)?;
        let name = self.string(name);
        let sig = self.blob(sig)?;

        Ok(self.push_row(TableId::MemberRef, vec![parent, name, sig]))
    }

    /// Reference an instance method.
    pub fn add_member_ref(
        &mut self,
        parent: MetadataToken,
        name: &str,
        parameters: &[u8],
        return_type: u8,
    ) -> Result<MetadataToken, ClrMetadataError> {
        let sig = method_signature(
            true,
            &primitives(parameters),
            &SigType::Primitive(return_type),
        )?;

        self.add_member_ref_with_signature(parent, name, &sig)
    }

    /// Reference a field.
    pub fn add_field_ref(
        &mut self,
        parent: MetadataToken,
        name: &str,
        element: u8,
    ) -> Result<MetadataToken, ClrMetadataError> {
        self.add_member_ref_with_signature(parent, name, &[CALLING_CONVENTION_FIELD, element])
    }

    fn add_type_definition(
        &mut self,
        flags: u32,
        namespace: &str,
        name: &str,
        extends: Option<MetadataToken>,
    ) -> Result<MetadataToken, ClrMetadataError> {
        let name = self.string(name);
        let namespace = self.string(namespace);
        let extends = match extends {
            Some(token) => Self::coded(CodedIndex::TypeDefOrRef, token)?,
            None => 0,
        };
        let field_list = self.row_count(TableId::Field) + 1;
        let method_list = self.row_count(TableId::MethodDef) + 1;

        let token = self.push_row(
            TableId::TypeDef,
            vec![flags, name, namespace, extends, field_list, method_list],
        );
        self.current_type = token.row;

        Ok(token)
    }

    /// Define a class. Subsequent members are added to it.
    pub fn add_type(&mut self, namespace: &str, name: &str) -> Result<MetadataToken, ClrMetadataError> {
        self.add_type_definition(TYPE_PUBLIC | TYPE_BEFORE_FIELD_INIT, namespace, name, None)
    }

    /// Define a class nested in the current type. Subsequent members are added to it.
    pub fn add_nested_type(&mut self, name: &str) -> Result<MetadataToken, ClrMetadataError> {
        let enclosing = self.current_type;
        let token = self.add_type_definition(TYPE_NESTED_PUBLIC, "", name, None)?;
        self.push_row(TableId::NestedClass, vec![token.row, enclosing]);

        Ok(token)
    }

    /// Define an enum with the given underlying element type.
    pub fn add_enum(
        &mut self,
        namespace: &str,
        name: &str,
        underlying: u8,
    ) -> Result<MetadataToken, ClrMetadataError> {
        let base = self.core_type("Enum")?;
        let token = self.add_type_definition(TYPE_PUBLIC | TYPE_SEALED, namespace, name, Some(base))?;
        self.add_field_with_flags("value__", underlying, FIELD_ENUM_VALUE)?;
        self.enums.insert(token, underlying);

        Ok(token)
    }

    /// Define an attribute class with a single constructor, returning the constructor.
    pub fn add_attribute_type(
        &mut self,
        namespace: &str,
        name: &str,
        parameters: &[SigType],
    ) -> Result<MetadataToken, ClrMetadataError> {
        let base = self.core_type("Attribute")?;
        self.add_type_definition(TYPE_PUBLIC | TYPE_BEFORE_FIELD_INIT, namespace, name, Some(base))?;

        let sig = method_signature(true, parameters, &SigType::Primitive(ELEMENT_TYPE_VOID))?;
        let constructor = self.add_method_with_signature(".ctor", METHOD_CONSTRUCTOR, &sig)?;
        self.constructors.insert(constructor, parameters.to_vec());

        Ok(constructor)
    }

    fn add_method_with_signature(
        &mut self,
        name: &str,
        flags: u32,
        sig: &[u8],
    ) -> Result<MetadataToken, ClrMetadataError> {
        let name = self.string(name);
        let sig = self.blob(sig)?;
        let param_list = self.row_count(TableId::Param) + 1;

        Ok(self.push_row(TableId::MethodDef, vec![0, 0, flags, name, sig, param_list]))
    }

    /// Define an instance method on the current type.
    pub fn add_method(
        &mut self,
        name: &str,
        parameters: &[u8],
        return_type: u8,
    ) -> Result<MetadataToken, ClrMetadataError> {
        let sig = method_signature(
            true,
            &primitives(parameters),
            &SigType::Primitive(return_type),
        )?;

        self.add_method_with_signature(name, METHOD_PUBLIC_HIDE_BY_SIG, &sig)
    }

    fn add_field_with_flags(
        &mut self,
        name: &str,
        element: u8,
        flags: u32,
    ) -> Result<MetadataToken, ClrMetadataError> {
        let name = self.string(name);
        let sig = self.blob(&[CALLING_CONVENTION_FIELD, element])?;

        Ok(self.push_row(TableId::Field, vec![flags, name, sig]))
    }

    /// Define a field on the current type.
    pub fn add_field(
        &mut self,
        name: &str,
        element: u8,
        is_static: bool,
    ) -> Result<MetadataToken, ClrMetadataError> {
        let flags = if is_static {
            FIELD_PUBLIC | FIELD_STATIC
        } else {
            FIELD_PUBLIC
        };

        self.add_field_with_flags(name, element, flags)
    }

    /// Define an `int32` instance property on the current type.
    ///
    /// Accessor methods are not implied and should be added with [Self::add_method].
    pub fn add_property(&mut self, name: &str) -> Result<MetadataToken, ClrMetadataError> {
        let owner = self.current_type;
        let has_map = self.rows[TableId::PropertyMap as usize]
            .last()
            .map(|row| row[0] == owner)
            .unwrap_or(false);

        if !has_map {
            let property_list = self.row_count(TableId::Property) + 1;
            self.push_row(TableId::PropertyMap, vec![owner, property_list]);
        }

        let name = self.string(name);
        let sig = self.blob(&[
            CALLING_CONVENTION_PROPERTY | CALLING_CONVENTION_HAS_THIS,
            0,
            ELEMENT_TYPE_I4,
        ])?;

        Ok(self.push_row(TableId::Property, vec![0, name, sig]))
    }

    fn write_attribute_argument(
        &self,
        dest: &mut Vec<u8>,
        ty: &SigType,
        value: &AttributeValue,
    ) -> Result<(), ClrMetadataError> {
        match ty {
            SigType::Primitive(element) => write_primitive_value(dest, *element, value),
            SigType::String => write_primitive_value(dest, ELEMENT_TYPE_STRING, value),
            SigType::Class(_) => match value {
                AttributeValue::Type(name) => write_ser_string(dest, name.as_deref()),
                _ => Err(value_mismatch(value, "System.Type")),
            },
            SigType::ValueType(token) => {
                let element = self.enums.get(token).ok_or_else(|| {
                    ClrMetadataError::BadAttributeValue(format!("{} is not a known enum", token))
                })?;
                write_primitive_value(dest, *element, value)
            }
            SigType::SzArray(element) => match value {
                AttributeValue::Array(None) => {
                    dest.iowrite_with(u32::MAX, scroll::LE)?;
                    Ok(())
                }
                AttributeValue::Array(Some(values)) => {
                    dest.iowrite_with(values.len() as u32, scroll::LE)?;
                    for value in values {
                        self.write_attribute_argument(dest, element, value)?;
                    }
                    Ok(())
                }
                _ => Err(value_mismatch(value, "an array")),
            },
            SigType::Object => {
                let element = match value {
                    AttributeValue::Bool(_) => ELEMENT_TYPE_BOOLEAN,
                    AttributeValue::Char(_) => ELEMENT_TYPE_CHAR,
                    AttributeValue::Int(_) => ELEMENT_TYPE_I4,
                    AttributeValue::UInt(_) => ELEMENT_TYPE_U4,
                    AttributeValue::Float(_) => ELEMENT_TYPE_R8,
                    AttributeValue::String(_) => ELEMENT_TYPE_STRING,
                    AttributeValue::Type(name) => {
                        dest.push(SERIALIZATION_TYPE_TYPE);
                        return write_ser_string(dest, name.as_deref());
                    }
                    AttributeValue::Array(_) => return Err(value_mismatch(value, "a boxed value")),
                };
                dest.push(element);
                write_primitive_value(dest, element, value)
            }
            SigType::GenericInstance { .. } | SigType::Other(_) => {
                Err(value_mismatch(value, "an attribute argument"))
            }
        }
    }

    /// Attach a custom attribute to a declaration.
    ///
    /// `constructor` must come from [Self::add_attribute_type]. Arguments are
    /// encoded according to the constructor's parameter types.
    pub fn add_custom_attribute(
        &mut self,
        parent: MetadataToken,
        constructor: MetadataToken,
        arguments: &[AttributeValue],
    ) -> Result<(), ClrMetadataError> {
        let parameters = self.constructors.get(&constructor).ok_or_else(|| {
            ClrMetadataError::BadAttributeValue(format!("{} is not a known constructor", constructor))
        })?;

        if parameters.len() != arguments.len() {
            return Err(ClrMetadataError::BadAttributeValue(format!(
                "constructor takes {} arguments; got {}",
                parameters.len(),
                arguments.len()
            )));
        }

        let mut value = vec![0x01, 0x00];
        for (ty, argument) in parameters.iter().zip(arguments) {
            self.write_attribute_argument(&mut value, ty, argument)?;
        }
        // No named arguments.
        value.extend_from_slice(&[0x00, 0x00]);

        let parent = Self::coded(CodedIndex::HasCustomAttribute, parent)?;
        let constructor = Self::coded(CodedIndex::CustomAttributeType, constructor)?;
        let value = self.blob(&value)?;

        self.push_row(TableId::CustomAttribute, vec![parent, constructor, value]);

        Ok(())
    }

    fn tables_stream(&self) -> Result<Vec<u8>, ClrMetadataError> {
        let mut row_counts = [0u32; TABLE_COUNT];
        for table in TableId::ALL {
            row_counts[table as usize] = self.row_count(table);
        }

        let mut heap_sizes = 0;
        if self.strings.len() > 0xffff {
            heap_sizes |= HEAP_SIZE_WIDE_STRINGS;
        }
        if self.blobs.len() > 0xffff {
            heap_sizes |= HEAP_SIZE_WIDE_BLOBS;
        }

        let layout = TableLayout {
            heap_sizes,
            row_counts,
        };

        let valid = TableId::ALL
            .iter()
            .filter(|t| layout.row_count(**t) > 0)
            .fold(0u64, |acc, t| acc | (1 << t.number()));

        let mut stream = vec![];
        stream.iowrite_with(0u32, scroll::LE)?;
        stream.iowrite_with(2u8, scroll::LE)?;
        stream.iowrite_with(0u8, scroll::LE)?;
        stream.iowrite_with(heap_sizes, scroll::LE)?;
        stream.iowrite_with(1u8, scroll::LE)?;
        stream.iowrite_with(valid, scroll::LE)?;
        stream.iowrite_with(0u64, scroll::LE)?;

        for table in TableId::ALL {
            if layout.row_count(table) > 0 {
                stream.iowrite_with(layout.row_count(table), scroll::LE)?;
            }
        }

        for table in TableId::ALL {
            let mut rows = self.rows[table as usize].clone();

            // Readers may binary search attributes by parent.
            if table == TableId::CustomAttribute {
                rows.sort_by_key(|row| row[0]);
            }

            for row in rows {
                for (column, value) in table.columns().iter().zip(row) {
                    match layout.column_width(*column) {
                        2 => stream.iowrite_with(value as u16, scroll::LE)?,
                        _ => stream.iowrite_with(value, scroll::LE)?,
                    }
                }
            }
        }

        pad4(&mut stream);

        Ok(stream)
    }

    fn metadata(&self) -> Result<Vec<u8>, ClrMetadataError> {
        let mut strings = self.strings.clone();
        pad4(&mut strings);
        let mut blobs = self.blobs.clone();
        pad4(&mut blobs);

        let mut mvid = [0u8; 16];
        for (i, b) in self.module_name.bytes().enumerate() {
            mvid[i % 16] ^= b;
        }

        let streams: [(&str, Vec<u8>); 5] = [
            ("#~", self.tables_stream()?),
            ("#Strings", strings),
            ("#US", vec![0; 4]),
            ("#GUID", mvid.to_vec()),
            ("#Blob", blobs),
        ];

        let names = streams
            .iter()
            .map(|(name, _)| {
                let mut name = name.as_bytes().to_vec();
                name.push(0);
                pad4(&mut name);
                name
            })
            .collect::<Vec<_>>();

        let header_size = 16
            + RUNTIME_VERSION.len()
            + 4
            + names.iter().map(|name| 8 + name.len()).sum::<usize>();

        let mut metadata = vec![];
        metadata.iowrite_with(METADATA_SIGNATURE, scroll::LE)?;
        metadata.iowrite_with(1u16, scroll::LE)?;
        metadata.iowrite_with(1u16, scroll::LE)?;
        metadata.iowrite_with(0u32, scroll::LE)?;
        metadata.iowrite_with(RUNTIME_VERSION.len() as u32, scroll::LE)?;
        metadata.extend_from_slice(RUNTIME_VERSION);
        metadata.iowrite_with(0u16, scroll::LE)?;
        metadata.iowrite_with(streams.len() as u16, scroll::LE)?;

        let mut offset = header_size;
        for ((_, data), name) in streams.iter().zip(&names) {
            metadata.iowrite_with(offset as u32, scroll::LE)?;
            metadata.iowrite_with(data.len() as u32, scroll::LE)?;
            metadata.extend_from_slice(name);
            offset += data.len();
        }

        for (_, data) in &streams {
            metadata.extend_from_slice(data);
        }

        Ok(metadata)
    }

    /// A copy with the `Module` and `Assembly` rows filled in.
    fn with_module_rows(&self) -> Self {
        let mut builder = self.clone();

        let module_name = builder.string(&self.module_name);
        builder.rows[TableId::Module as usize] = vec![vec![0, module_name, 1, 0, 0]];

        if let Some(name) = &self.assembly_name {
            let name = builder.string(name);
            builder.rows[TableId::Assembly as usize] =
                vec![vec![0x8004, 1, 0, 0, 0, 0, 0, name, 0]];
        }

        builder
    }

    /// Produce the bytes of a PE image.
    pub fn to_pe_bytes(&self) -> Result<Vec<u8>, ClrMetadataError> {
        let metadata = self.with_module_rows().metadata()?;

        let mut text = vec![];
        text.iowrite_with(
            CliHeader {
                cb: CLI_HEADER_SIZE,
                major_runtime_version: 2,
                minor_runtime_version: 5,
                metadata_rva: TEXT_RVA + CLI_HEADER_SIZE,
                metadata_size: metadata.len() as u32,
                flags: COMIMAGE_FLAGS_ILONLY,
                ..Default::default()
            },
            scroll::LE,
        )?;
        text.extend_from_slice(&metadata);

        let virtual_size = text.len() as u32;
        let raw_size = align(virtual_size, FILE_ALIGNMENT);
        text.resize(raw_size as usize, 0);

        let mut image = b"MZ".to_vec();
        image.resize(0x3c, 0);
        image.iowrite_with(PE_HEADER_OFFSET, scroll::LE)?;
        image.resize(PE_HEADER_OFFSET as usize, 0);
        image.extend_from_slice(b"PE\0\0");

        // COFF header: i386, 1 section, PE32 optional header, executable | 32 bit.
        image.iowrite_with(0x14cu16, scroll::LE)?;
        image.iowrite_with(1u16, scroll::LE)?;
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(0xe0u16, scroll::LE)?;
        image.iowrite_with(0x0102u16, scroll::LE)?;

        // Optional header standard fields.
        image.iowrite_with(0x10bu16, scroll::LE)?;
        image.iowrite_with(8u8, scroll::LE)?;
        image.iowrite_with(0u8, scroll::LE)?;
        image.iowrite_with(raw_size, scroll::LE)?;
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(TEXT_RVA, scroll::LE)?;
        image.iowrite_with(0u32, scroll::LE)?;

        // Windows fields.
        image.iowrite_with(0x0040_0000u32, scroll::LE)?;
        image.iowrite_with(SECTION_ALIGNMENT, scroll::LE)?;
        image.iowrite_with(FILE_ALIGNMENT, scroll::LE)?;
        for version in [4u16, 0, 0, 0, 4, 0] {
            image.iowrite_with(version, scroll::LE)?;
        }
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(TEXT_RVA + align(virtual_size, SECTION_ALIGNMENT), scroll::LE)?;
        image.iowrite_with(FILE_ALIGNMENT, scroll::LE)?;
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(3u16, scroll::LE)?;
        image.iowrite_with(0x8540u16, scroll::LE)?;
        for size in [0x0010_0000u32, 0x1000, 0x0010_0000, 0x1000] {
            image.iowrite_with(size, scroll::LE)?;
        }
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(16u32, scroll::LE)?;

        for index in 0..16 {
            let (rva, size) = if index == CLR_DIRECTORY_INDEX {
                (TEXT_RVA, CLI_HEADER_SIZE)
            } else {
                (0, 0)
            };
            image.iowrite_with(rva, scroll::LE)?;
            image.iowrite_with(size, scroll::LE)?;
        }

        // Section table.
        image.extend_from_slice(b".text\0\0\0");
        image.iowrite_with(virtual_size, scroll::LE)?;
        image.iowrite_with(TEXT_RVA, scroll::LE)?;
        image.iowrite_with(raw_size, scroll::LE)?;
        image.iowrite_with(FILE_ALIGNMENT, scroll::LE)?;
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(0u32, scroll::LE)?;
        image.iowrite_with(0u16, scroll::LE)?;
        image.iowrite_with(0u16, scroll::LE)?;
        image.iowrite_with(0x6000_0020u32, scroll::LE)?;

        image.resize(FILE_ALIGNMENT as usize, 0);
        image.extend_from_slice(&text);

        Ok(image)
    }

    /// Write the PE image to a file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ClrMetadataError> {
        std::fs::write(path, self.to_pe_bytes()?)?;

        Ok(())
    }
}
