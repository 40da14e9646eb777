// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The view of module metadata the auditor works with.

Module metadata is accessed through [MetadataReader] so the module graph
and availability checks are independent of how modules are parsed.
[crate::clr::ClrMetadataReader] is the implementation backed by
`clr-metadata`.
*/

use {
    crate::VersionCheckError,
    clr_metadata::{AttributeValue, TypeName},
    std::{fmt::Display, path::Path},
};

/// How a referenced member is looked up on its declaring type.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MemberKind {
    Method,
    Property,
}

/// A member referenced on an external type.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MemberRef {
    pub name: String,
    pub kind: MemberKind,
}

impl MemberRef {
    pub fn method(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            kind: MemberKind::Method,
        }
    }

    pub fn property(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            kind: MemberKind::Property,
        }
    }
}

/// A use of a type, or of a member of a type, defined in another module.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ApiReference {
    /// Name of the module defining the type.
    pub owner_module: String,
    pub declaring_type: TypeName,
    /// `None` for a reference to the type itself.
    pub member: Option<MemberRef>,
}

impl ApiReference {
    pub fn to_type(owner_module: impl ToString, declaring_type: TypeName) -> Self {
        Self {
            owner_module: owner_module.to_string(),
            declaring_type,
            member: None,
        }
    }

    pub fn to_member(owner_module: impl ToString, declaring_type: TypeName, member: MemberRef) -> Self {
        Self {
            owner_module: owner_module.to_string(),
            declaring_type,
            member: Some(member),
        }
    }

    /// For a reference to a property accessor (`get_X`, `set_X`), a reference
    /// to property `X` of the same type.
    pub fn accessed_property(&self) -> Option<Self> {
        let member = self
            .member
            .as_ref()
            .filter(|m| m.kind == MemberKind::Method)?;

        let property = member
            .name
            .strip_prefix("get_")
            .or_else(|| member.name.strip_prefix("set_"))
            .filter(|name| !name.is_empty())?;

        Some(Self::to_member(
            self.owner_module.clone(),
            self.declaring_type.clone(),
            MemberRef::property(property),
        ))
    }

    /// The name violations are reported under.
    ///
    /// Types use their simple name. Members are `Type.Member`.
    pub fn display_name(&self) -> String {
        match &self.member {
            Some(member) => format!("{}.{}", self.declaring_type.name, member.name),
            None => self.declaring_type.name.clone(),
        }
    }
}

impl Display for ApiReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.member {
            Some(member) => write!(f, "{} on {}", member.name, self.declaring_type),
            None => write!(f, "{}", self.declaring_type),
        }
    }
}

/// Metadata extracted from one module.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModuleInfo {
    /// Assembly name, or the file stem for modules without a manifest.
    pub identity: String,
    /// Names of referenced modules.
    pub references: Vec<String>,
    pub api_references: Vec<ApiReference>,
}

/// A custom attribute attached to a declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeData {
    pub type_name: TypeName,
    pub arguments: Vec<AttributeValue>,
}

/// Reads modules and looks up declarations in referenced modules.
pub trait MetadataReader {
    /// Extract the metadata of the module at `path`.
    fn read_module(&mut self, path: &Path) -> Result<ModuleInfo, VersionCheckError>;

    /// Register a directory in which referenced modules are located.
    fn add_search_directory(&mut self, directory: &Path);

    /// Attributes of a type defined in `module`.
    ///
    /// `Ok(None)` means the module or type could not be found.
    fn type_attributes(
        &mut self,
        module: &str,
        type_name: &TypeName,
    ) -> Result<Option<Vec<AttributeData>>, VersionCheckError>;

    /// Attributes of the first member named `member.name` of the kind
    /// `member.kind` declared by a type defined in `module`.
    ///
    /// `Ok(None)` means the module, type or member could not be found.
    fn member_attributes(
        &mut self,
        module: &str,
        type_name: &TypeName,
        member: &MemberRef,
    ) -> Result<Option<Vec<AttributeData>>, VersionCheckError>;
}
