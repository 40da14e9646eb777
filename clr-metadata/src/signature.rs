// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Signature blobs and custom attribute values.

Only as much of the signature grammar (ECMA-335 II.23.2) is modeled as is
needed to tell methods from fields, walk parameter lists and decode the
fixed arguments of custom attributes (II.23.3). Types that cannot appear
in attribute constructors are parsed for their length and otherwise
collapsed into [SigType::Other].
*/

use {
    crate::{
        heaps::read_compressed_u32,
        tables::{MetadataToken, TableId},
        ClrMetadataError,
    },
    scroll::Pread,
};

pub const ELEMENT_TYPE_VOID: u8 = 0x01;
pub const ELEMENT_TYPE_BOOLEAN: u8 = 0x02;
pub const ELEMENT_TYPE_CHAR: u8 = 0x03;
pub const ELEMENT_TYPE_I1: u8 = 0x04;
pub const ELEMENT_TYPE_U1: u8 = 0x05;
pub const ELEMENT_TYPE_I2: u8 = 0x06;
pub const ELEMENT_TYPE_U2: u8 = 0x07;
pub const ELEMENT_TYPE_I4: u8 = 0x08;
pub const ELEMENT_TYPE_U4: u8 = 0x09;
pub const ELEMENT_TYPE_I8: u8 = 0x0a;
pub const ELEMENT_TYPE_U8: u8 = 0x0b;
pub const ELEMENT_TYPE_R4: u8 = 0x0c;
pub const ELEMENT_TYPE_R8: u8 = 0x0d;
pub const ELEMENT_TYPE_STRING: u8 = 0x0e;
pub const ELEMENT_TYPE_PTR: u8 = 0x0f;
pub const ELEMENT_TYPE_BYREF: u8 = 0x10;
pub const ELEMENT_TYPE_VALUETYPE: u8 = 0x11;
pub const ELEMENT_TYPE_CLASS: u8 = 0x12;
pub const ELEMENT_TYPE_VAR: u8 = 0x13;
pub const ELEMENT_TYPE_ARRAY: u8 = 0x14;
pub const ELEMENT_TYPE_GENERICINST: u8 = 0x15;
pub const ELEMENT_TYPE_TYPEDBYREF: u8 = 0x16;
pub const ELEMENT_TYPE_I: u8 = 0x18;
pub const ELEMENT_TYPE_U: u8 = 0x19;
pub const ELEMENT_TYPE_FNPTR: u8 = 0x1b;
pub const ELEMENT_TYPE_OBJECT: u8 = 0x1c;
pub const ELEMENT_TYPE_SZARRAY: u8 = 0x1d;
pub const ELEMENT_TYPE_MVAR: u8 = 0x1e;
pub const ELEMENT_TYPE_CMOD_REQD: u8 = 0x1f;
pub const ELEMENT_TYPE_CMOD_OPT: u8 = 0x20;
pub const ELEMENT_TYPE_SENTINEL: u8 = 0x41;
pub const ELEMENT_TYPE_PINNED: u8 = 0x45;

/// `FieldOrPropType` marker for `System.Type` in attribute blobs.
pub const SERIALIZATION_TYPE_TYPE: u8 = 0x50;
/// `FieldOrPropType` marker for a boxed value in attribute blobs.
pub const SERIALIZATION_TYPE_TAGGED_OBJECT: u8 = 0x51;
/// `FieldOrPropType` marker for an enum in attribute blobs.
pub const SERIALIZATION_TYPE_ENUM: u8 = 0x55;

pub const CALLING_CONVENTION_FIELD: u8 = 0x06;
pub const CALLING_CONVENTION_PROPERTY: u8 = 0x08;
pub const CALLING_CONVENTION_GENERIC: u8 = 0x10;
pub const CALLING_CONVENTION_HAS_THIS: u8 = 0x20;

/// A type appearing in a signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SigType {
    /// A primitive type, identified by its `ELEMENT_TYPE_*` value.
    Primitive(u8),
    String,
    Object,
    Class(MetadataToken),
    ValueType(MetadataToken),
    SzArray(Box<SigType>),
    GenericInstance {
        generic_type: MetadataToken,
        arguments: Vec<SigType>,
    },
    /// Anything else: pointers, generic parameters, multi-dimensional arrays, ...
    Other(u8),
}

/// A method signature (`MethodDefSig` / `MethodRefSig`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodSignature {
    pub has_this: bool,
    pub generic_parameter_count: u32,
    pub return_type: SigType,
    pub parameters: Vec<SigType>,
}

/// The signature of a `MemberRef` row.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemberSignature {
    Method(MethodSignature),
    Field(SigType),
}

fn read_u8(data: &[u8], offset: &mut usize) -> Result<u8, ClrMetadataError> {
    Ok(data.gread_with::<u8>(offset, scroll::LE)?)
}

fn peek_u8(data: &[u8], offset: usize) -> Result<u8, ClrMetadataError> {
    data.get(offset)
        .copied()
        .ok_or(ClrMetadataError::BadSignature("unexpected end of signature"))
}

/// Decode a `TypeDefOrRefOrSpecEncoded` value.
pub fn read_type_def_or_ref(
    data: &[u8],
    offset: &mut usize,
) -> Result<MetadataToken, ClrMetadataError> {
    let value = read_compressed_u32(data, offset)?;

    let table = match value & 0x3 {
        0 => TableId::TypeDef,
        1 => TableId::TypeRef,
        2 => TableId::TypeSpec,
        _ => return Err(ClrMetadataError::BadSignature("bad TypeDefOrRef encoding")),
    };

    Ok(MetadataToken::new(table, value >> 2))
}

fn skip_custom_modifiers(data: &[u8], offset: &mut usize) -> Result<(), ClrMetadataError> {
    while matches!(
        peek_u8(data, *offset),
        Ok(ELEMENT_TYPE_CMOD_OPT) | Ok(ELEMENT_TYPE_CMOD_REQD)
    ) {
        *offset += 1;
        read_type_def_or_ref(data, offset)?;
    }

    Ok(())
}

/// Parse a single type, advancing `offset`.
pub fn read_type(data: &[u8], offset: &mut usize) -> Result<SigType, ClrMetadataError> {
    skip_custom_modifiers(data, offset)?;

    let element = read_u8(data, offset)?;

    Ok(match element {
        ELEMENT_TYPE_VOID..=ELEMENT_TYPE_R8
        | ELEMENT_TYPE_I
        | ELEMENT_TYPE_U
        | ELEMENT_TYPE_TYPEDBYREF => SigType::Primitive(element),
        ELEMENT_TYPE_STRING => SigType::String,
        ELEMENT_TYPE_OBJECT => SigType::Object,
        ELEMENT_TYPE_CLASS => SigType::Class(read_type_def_or_ref(data, offset)?),
        ELEMENT_TYPE_VALUETYPE => SigType::ValueType(read_type_def_or_ref(data, offset)?),
        ELEMENT_TYPE_SZARRAY => SigType::SzArray(Box::new(read_type(data, offset)?)),
        ELEMENT_TYPE_PTR | ELEMENT_TYPE_BYREF | ELEMENT_TYPE_PINNED => {
            read_type(data, offset)?;
            SigType::Other(element)
        }
        ELEMENT_TYPE_VAR | ELEMENT_TYPE_MVAR => {
            read_compressed_u32(data, offset)?;
            SigType::Other(element)
        }
        ELEMENT_TYPE_GENERICINST => {
            let kind = read_u8(data, offset)?;
            if kind != ELEMENT_TYPE_CLASS && kind != ELEMENT_TYPE_VALUETYPE {
                return Err(ClrMetadataError::BadSignature("bad generic instance kind"));
            }

            let generic_type = read_type_def_or_ref(data, offset)?;
            let count = read_compressed_u32(data, offset)?;
            let arguments = (0..count)
                .map(|_| read_type(data, offset))
                .collect::<Result<Vec<_>, _>>()?;

            SigType::GenericInstance {
                generic_type,
                arguments,
            }
        }
        ELEMENT_TYPE_ARRAY => {
            read_type(data, offset)?;
            let _rank = read_compressed_u32(data, offset)?;
            let sizes = read_compressed_u32(data, offset)?;
            for _ in 0..sizes {
                read_compressed_u32(data, offset)?;
            }
            let lower_bounds = read_compressed_u32(data, offset)?;
            for _ in 0..lower_bounds {
                read_compressed_u32(data, offset)?;
            }
            SigType::Other(element)
        }
        ELEMENT_TYPE_FNPTR => {
            read_method_signature_at(data, offset)?;
            SigType::Other(element)
        }
        _ => return Err(ClrMetadataError::BadSignature("unknown element type")),
    })
}

fn read_method_signature_at(
    data: &[u8],
    offset: &mut usize,
) -> Result<MethodSignature, ClrMetadataError> {
    let convention = read_u8(data, offset)?;

    let generic_parameter_count = if convention & CALLING_CONVENTION_GENERIC != 0 {
        read_compressed_u32(data, offset)?
    } else {
        0
    };

    let count = read_compressed_u32(data, offset)?;
    let return_type = read_type(data, offset)?;

    let mut parameters = Vec::with_capacity(count as usize);
    while parameters.len() < count as usize {
        // Vararg call sites separate fixed and variable arguments with a sentinel.
        if peek_u8(data, *offset)? == ELEMENT_TYPE_SENTINEL {
            *offset += 1;
            continue;
        }
        parameters.push(read_type(data, offset)?);
    }

    Ok(MethodSignature {
        has_this: convention & CALLING_CONVENTION_HAS_THIS != 0,
        generic_parameter_count,
        return_type,
        parameters,
    })
}

/// Parse a method signature blob.
pub fn parse_method_signature(data: &[u8]) -> Result<MethodSignature, ClrMetadataError> {
    if matches!(data.first(), Some(b) if b & 0x0f == CALLING_CONVENTION_FIELD) {
        return Err(ClrMetadataError::BadSignature("field signature where method expected"));
    }

    read_method_signature_at(data, &mut 0)
}

/// Parse a field signature blob, returning the field type.
pub fn parse_field_signature(data: &[u8]) -> Result<SigType, ClrMetadataError> {
    let offset = &mut 0;

    if read_u8(data, offset)? != CALLING_CONVENTION_FIELD {
        return Err(ClrMetadataError::BadSignature("not a field signature"));
    }

    read_type(data, offset)
}

/// Parse the signature of a `MemberRef`, which is either a method or a field.
pub fn parse_member_signature(data: &[u8]) -> Result<MemberSignature, ClrMetadataError> {
    match data.first() {
        Some(&CALLING_CONVENTION_FIELD) => Ok(MemberSignature::Field(parse_field_signature(data)?)),
        Some(_) => Ok(MemberSignature::Method(parse_method_signature(data)?)),
        None => Err(ClrMetadataError::BadSignature("empty member signature")),
    }
}

/// Parse a `TypeSpec` blob.
pub fn parse_type_spec(data: &[u8]) -> Result<SigType, ClrMetadataError> {
    read_type(data, &mut 0)
}

/// A decoded custom attribute argument.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Char(u16),
    /// Any signed integer, including enums with a signed underlying type.
    Int(i64),
    /// Any unsigned integer, including enums with an unsigned underlying type.
    UInt(u64),
    Float(f64),
    /// A string. `None` is a null reference.
    String(Option<String>),
    /// A `System.Type`, serialized as its assembly qualified name.
    Type(Option<String>),
    /// A single dimension array. `None` is a null reference.
    Array(Option<Vec<AttributeValue>>),
}

impl AttributeValue {
    /// Obtain an integer value regardless of signedness.
    ///
    /// Returns `None` for non-integers and for unsigned values above `i64::MAX`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(Some(s)) | Self::Type(Some(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Answers type questions that arise while decoding attribute blobs.
pub trait AttributeTypeResolver {
    /// Whether the token refers to `System.Type`.
    fn is_system_type(&self, token: MetadataToken) -> Result<bool, ClrMetadataError>;

    /// The `ELEMENT_TYPE_*` of an enum's underlying type.
    ///
    /// `Ok(None)` when the token cannot be resolved to an enum definition.
    fn enum_underlying_type(&self, token: MetadataToken) -> Result<Option<u8>, ClrMetadataError>;
}

fn read_ser_string(data: &[u8], offset: &mut usize) -> Result<Option<String>, ClrMetadataError> {
    if peek_u8(data, *offset)? == 0xff {
        *offset += 1;
        return Ok(None);
    }

    let len = read_compressed_u32(data, offset)? as usize;
    let raw = data
        .get(*offset..*offset + len)
        .ok_or_else(|| ClrMetadataError::BadAttributeValue("string runs past end".into()))?;
    *offset += len;

    Ok(Some(
        String::from_utf8(raw.to_vec()).map_err(|_| ClrMetadataError::BadUtf8)?,
    ))
}

fn read_primitive(
    data: &[u8],
    offset: &mut usize,
    element: u8,
) -> Result<AttributeValue, ClrMetadataError> {
    Ok(match element {
        ELEMENT_TYPE_BOOLEAN => AttributeValue::Bool(data.gread_with::<u8>(offset, scroll::LE)? != 0),
        ELEMENT_TYPE_CHAR => AttributeValue::Char(data.gread_with::<u16>(offset, scroll::LE)?),
        ELEMENT_TYPE_I1 => AttributeValue::Int(data.gread_with::<i8>(offset, scroll::LE)? as i64),
        ELEMENT_TYPE_U1 => AttributeValue::UInt(data.gread_with::<u8>(offset, scroll::LE)? as u64),
        ELEMENT_TYPE_I2 => AttributeValue::Int(data.gread_with::<i16>(offset, scroll::LE)? as i64),
        ELEMENT_TYPE_U2 => AttributeValue::UInt(data.gread_with::<u16>(offset, scroll::LE)? as u64),
        ELEMENT_TYPE_I4 => AttributeValue::Int(data.gread_with::<i32>(offset, scroll::LE)? as i64),
        ELEMENT_TYPE_U4 => AttributeValue::UInt(data.gread_with::<u32>(offset, scroll::LE)? as u64),
        ELEMENT_TYPE_I8 => AttributeValue::Int(data.gread_with::<i64>(offset, scroll::LE)?),
        ELEMENT_TYPE_U8 => AttributeValue::UInt(data.gread_with::<u64>(offset, scroll::LE)?),
        ELEMENT_TYPE_R4 => AttributeValue::Float(data.gread_with::<f32>(offset, scroll::LE)? as f64),
        ELEMENT_TYPE_R8 => AttributeValue::Float(data.gread_with::<f64>(offset, scroll::LE)?),
        ELEMENT_TYPE_STRING => AttributeValue::String(read_ser_string(data, offset)?),
        other => {
            return Err(ClrMetadataError::BadAttributeValue(format!(
                "element type {:#x} is not a valid attribute argument",
                other
            )))
        }
    })
}

fn read_array(
    data: &[u8],
    offset: &mut usize,
    mut element: impl FnMut(&mut usize) -> Result<AttributeValue, ClrMetadataError>,
) -> Result<AttributeValue, ClrMetadataError> {
    let count = data.gread_with::<u32>(offset, scroll::LE)?;

    if count == u32::MAX {
        return Ok(AttributeValue::Array(None));
    }

    let values = (0..count)
        .map(|_| element(offset))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AttributeValue::Array(Some(values)))
}

/// Read a value whose type is given inline as a `FieldOrPropType`.
fn read_tagged(data: &[u8], offset: &mut usize) -> Result<AttributeValue, ClrMetadataError> {
    let tag = read_u8(data, offset)?;

    match tag {
        ELEMENT_TYPE_BOOLEAN..=ELEMENT_TYPE_STRING => read_primitive(data, offset, tag),
        SERIALIZATION_TYPE_TYPE => Ok(AttributeValue::Type(read_ser_string(data, offset)?)),
        ELEMENT_TYPE_SZARRAY => {
            let element_tag = read_u8(data, offset)?;
            match element_tag {
                ELEMENT_TYPE_BOOLEAN..=ELEMENT_TYPE_STRING => {
                    read_array(data, offset, |o| read_primitive(data, o, element_tag))
                }
                SERIALIZATION_TYPE_TYPE => {
                    read_array(data, offset, |o| Ok(AttributeValue::Type(read_ser_string(data, o)?)))
                }
                SERIALIZATION_TYPE_TAGGED_OBJECT => read_array(data, offset, |o| read_tagged(data, o)),
                _ => Err(ClrMetadataError::BadAttributeValue(format!(
                    "unsupported boxed array element {:#x}",
                    element_tag
                ))),
            }
        }
        // Boxed enums name their type by string; the underlying width is unknowable
        // without loading that type.
        SERIALIZATION_TYPE_ENUM => Err(ClrMetadataError::BadAttributeValue(
            "boxed enum values are not supported".into(),
        )),
        _ => Err(ClrMetadataError::BadAttributeValue(format!(
            "unknown serialization type {:#x}",
            tag
        ))),
    }
}

fn read_fixed_argument(
    data: &[u8],
    offset: &mut usize,
    ty: &SigType,
    resolver: &dyn AttributeTypeResolver,
) -> Result<AttributeValue, ClrMetadataError> {
    match ty {
        SigType::Primitive(element) => read_primitive(data, offset, *element),
        SigType::String => read_primitive(data, offset, ELEMENT_TYPE_STRING),
        SigType::Object => read_tagged(data, offset),
        SigType::Class(token) => {
            if resolver.is_system_type(*token)? {
                Ok(AttributeValue::Type(read_ser_string(data, offset)?))
            } else {
                Err(ClrMetadataError::BadAttributeValue(format!(
                    "class {} is not a valid attribute argument type",
                    token
                )))
            }
        }
        SigType::ValueType(token) => match resolver.enum_underlying_type(*token)? {
            Some(element) => read_primitive(data, offset, element),
            None => Err(ClrMetadataError::BadAttributeValue(format!(
                "unable to resolve enum type {}",
                token
            ))),
        },
        SigType::SzArray(element) => {
            read_array(data, offset, |o| read_fixed_argument(data, o, element, resolver))
        }
        SigType::GenericInstance { .. } | SigType::Other(_) => Err(
            ClrMetadataError::BadAttributeValue("unsupported attribute argument type".into()),
        ),
    }
}

/// Decode the fixed (constructor) arguments of a custom attribute value blob.
///
/// Named arguments following the fixed arguments are not decoded.
pub fn decode_fixed_arguments(
    data: &[u8],
    constructor: &MethodSignature,
    resolver: &dyn AttributeTypeResolver,
) -> Result<Vec<AttributeValue>, ClrMetadataError> {
    let offset = &mut 0;

    let prolog = data.gread_with::<u16>(offset, scroll::LE)?;
    if prolog != 0x0001 {
        return Err(ClrMetadataError::BadAttributeValue(format!(
            "bad prolog {:#06x}",
            prolog
        )));
    }

    constructor
        .parameters
        .iter()
        .map(|ty| read_fixed_argument(data, offset, ty, resolver))
        .collect::<Result<Vec<_>, _>>()
}

#[cfg(test)]
mod test {
    use super::*;

    struct Resolver;

    impl AttributeTypeResolver for Resolver {
        fn is_system_type(&self, token: MetadataToken) -> Result<bool, ClrMetadataError> {
            Ok(token == MetadataToken::new(TableId::TypeRef, 9))
        }

        fn enum_underlying_type(
            &self,
            token: MetadataToken,
        ) -> Result<Option<u8>, ClrMetadataError> {
            Ok(if token == MetadataToken::new(TableId::TypeDef, 3) {
                Some(ELEMENT_TYPE_U1)
            } else {
                None
            })
        }
    }

    #[test]
    fn member_signatures() -> Result<(), ClrMetadataError> {
        // instance void (int32, string)
        let method = parse_member_signature(&[0x20, 0x02, 0x01, 0x08, 0x0e])?;
        assert_eq!(
            method,
            MemberSignature::Method(MethodSignature {
                has_this: true,
                generic_parameter_count: 0,
                return_type: SigType::Primitive(ELEMENT_TYPE_VOID),
                parameters: vec![SigType::Primitive(ELEMENT_TYPE_I4), SigType::String],
            })
        );

        // static !!0 M<T>(class [TypeRef 2])
        let generic = parse_method_signature(&[0x10, 0x01, 0x01, 0x1e, 0x00, 0x12, 0x09])?;
        assert_eq!(generic.generic_parameter_count, 1);
        assert!(!generic.has_this);
        assert_eq!(
            generic.parameters,
            vec![SigType::Class(MetadataToken::new(TableId::TypeRef, 2))]
        );

        // Field of type valuetype [TypeDef 3] with an optional modifier.
        let field = parse_member_signature(&[0x06, 0x20, 0x05, 0x11, 0x0c])?;
        assert_eq!(
            field,
            MemberSignature::Field(SigType::ValueType(MetadataToken::new(TableId::TypeDef, 3)))
        );

        assert!(parse_member_signature(&[]).is_err());
        assert!(parse_member_signature(&[0x20, 0x01, 0x01]).is_err());
        assert!(parse_field_signature(&[0x20, 0x00, 0x01]).is_err());

        Ok(())
    }

    #[test]
    fn generic_instance_type_spec() -> Result<(), ClrMetadataError> {
        // class [TypeRef 5]<int32>
        let spec = parse_type_spec(&[0x15, 0x12, 0x15, 0x01, 0x08])?;
        assert_eq!(
            spec,
            SigType::GenericInstance {
                generic_type: MetadataToken::new(TableId::TypeRef, 5),
                arguments: vec![SigType::Primitive(ELEMENT_TYPE_I4)],
            }
        );

        Ok(())
    }

    #[test]
    fn fixed_arguments() -> Result<(), ClrMetadataError> {
        let constructor = MethodSignature {
            has_this: true,
            generic_parameter_count: 0,
            return_type: SigType::Primitive(ELEMENT_TYPE_VOID),
            parameters: vec![
                SigType::ValueType(MetadataToken::new(TableId::TypeDef, 3)),
                SigType::Primitive(ELEMENT_TYPE_I4),
                SigType::Primitive(ELEMENT_TYPE_I4),
                SigType::String,
                SigType::String,
                SigType::Class(MetadataToken::new(TableId::TypeRef, 9)),
                SigType::SzArray(Box::new(SigType::Primitive(ELEMENT_TYPE_I2))),
                SigType::Object,
            ],
        };

        let mut blob = vec![0x01, 0x00, 0x01];
        blob.extend_from_slice(&10i32.to_le_bytes());
        blob.extend_from_slice(&11i32.to_le_bytes());
        blob.extend_from_slice(&[0x03, b'a', b'b', b'c']);
        blob.push(0xff);
        blob.extend_from_slice(&[0x01, b'T']);
        blob.extend_from_slice(&2u32.to_le_bytes());
        blob.extend_from_slice(&(-1i16).to_le_bytes());
        blob.extend_from_slice(&7i16.to_le_bytes());
        blob.push(ELEMENT_TYPE_BOOLEAN);
        blob.push(0x01);
        // No named arguments.
        blob.extend_from_slice(&[0x00, 0x00]);

        let values = decode_fixed_arguments(&blob, &constructor, &Resolver)?;
        assert_eq!(
            values,
            vec![
                AttributeValue::UInt(1),
                AttributeValue::Int(10),
                AttributeValue::Int(11),
                AttributeValue::String(Some("abc".into())),
                AttributeValue::String(None),
                AttributeValue::Type(Some("T".into())),
                AttributeValue::Array(Some(vec![AttributeValue::Int(-1), AttributeValue::Int(7)])),
                AttributeValue::Bool(true),
            ]
        );
        assert_eq!(values[0].as_i64(), Some(1));
        assert_eq!(values[3].as_str(), Some("abc"));

        Ok(())
    }

    #[test]
    fn fixed_argument_errors() {
        let enum_param = |row| MethodSignature {
            has_this: true,
            generic_parameter_count: 0,
            return_type: SigType::Primitive(ELEMENT_TYPE_VOID),
            parameters: vec![SigType::ValueType(MetadataToken::new(TableId::TypeDef, row))],
        };

        // Bad prolog.
        assert!(decode_fixed_arguments(&[0x02, 0x00, 0x01], &enum_param(3), &Resolver).is_err());
        // Truncated.
        assert!(decode_fixed_arguments(&[0x01, 0x00], &enum_param(3), &Resolver).is_err());
        // Enum that can't be resolved.
        assert!(decode_fixed_arguments(&[0x01, 0x00, 0x01], &enum_param(4), &Resolver).is_err());
    }
}
