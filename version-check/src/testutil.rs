// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fabricated modules and bundles for tests.

use {
    anyhow::Result,
    clr_metadata::{
        builder::AssemblyBuilder,
        signature::{ELEMENT_TYPE_I4, ELEMENT_TYPE_U1, ELEMENT_TYPE_VOID},
        AttributeValue, MetadataToken, SigType,
    },
    std::{collections::HashMap, path::Path},
};

/// An availability attribute to attach to a platform declaration.
#[derive(Clone, Copy, Debug)]
pub enum Availability {
    Introduced(i64, i64),
    Unavailable(u64),
    Deprecated(i64, i64),
}

/// Builds a stand-in for `Xamarin.Mac.dll`.
pub struct PlatformBuilder {
    builder: AssemblyBuilder,
    introduced: MetadataToken,
    unavailable: MetadataToken,
    deprecated: MetadataToken,
}

impl PlatformBuilder {
    pub fn new() -> Result<Self> {
        let mut builder = AssemblyBuilder::new("Xamarin.Mac");
        let platform = builder.add_enum("ObjCRuntime", "PlatformName", ELEMENT_TYPE_U1)?;

        let versioned = [
            SigType::ValueType(platform),
            SigType::Primitive(ELEMENT_TYPE_I4),
            SigType::Primitive(ELEMENT_TYPE_I4),
        ];
        let introduced = builder.add_attribute_type("ObjCRuntime", "IntroducedAttribute", &versioned)?;
        let deprecated = builder.add_attribute_type("ObjCRuntime", "DeprecatedAttribute", &versioned)?;
        let unavailable = builder.add_attribute_type(
            "ObjCRuntime",
            "UnavailableAttribute",
            &[SigType::ValueType(platform)],
        )?;

        Ok(Self {
            builder,
            introduced,
            unavailable,
            deprecated,
        })
    }

    fn annotate(&mut self, target: MetadataToken, availability: &[Availability]) -> Result<()> {
        for a in availability {
            let (constructor, arguments) = match *a {
                Availability::Introduced(major, minor) => (
                    self.introduced,
                    vec![
                        AttributeValue::UInt(1),
                        AttributeValue::Int(major),
                        AttributeValue::Int(minor),
                    ],
                ),
                Availability::Deprecated(major, minor) => (
                    self.deprecated,
                    vec![
                        AttributeValue::UInt(1),
                        AttributeValue::Int(major),
                        AttributeValue::Int(minor),
                    ],
                ),
                Availability::Unavailable(platform) => {
                    (self.unavailable, vec![AttributeValue::UInt(platform)])
                }
            };

            self.builder.add_custom_attribute(target, constructor, &arguments)?;
        }

        Ok(())
    }

    /// Define a type. Following members are declared on it.
    pub fn add_type(
        &mut self,
        namespace: &str,
        name: &str,
        availability: &[Availability],
    ) -> Result<&mut Self> {
        let token = self.builder.add_type(namespace, name)?;
        self.annotate(token, availability)?;

        Ok(self)
    }

    pub fn add_method(&mut self, name: &str, availability: &[Availability]) -> Result<&mut Self> {
        let token = self.builder.add_method(name, &[], ELEMENT_TYPE_VOID)?;
        self.annotate(token, availability)?;

        Ok(self)
    }

    /// Define a property along with its getter. Only the property is annotated.
    pub fn add_property(&mut self, name: &str, availability: &[Availability]) -> Result<&mut Self> {
        self.builder
            .add_method(&format!("get_{}", name), &[], ELEMENT_TYPE_I4)?;
        let token = self.builder.add_property(name)?;
        self.annotate(token, availability)?;

        Ok(self)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        Ok(self.builder.write_to(path)?)
    }
}

/// Builds a user module referencing other modules and platform APIs.
pub struct ModuleBuilder {
    builder: AssemblyBuilder,
    assemblies: HashMap<String, MetadataToken>,
    types: HashMap<(String, String, String), MetadataToken>,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            builder: AssemblyBuilder::new(name),
            assemblies: HashMap::new(),
            types: HashMap::new(),
        }
    }

    fn assembly(&mut self, name: &str) -> Result<MetadataToken> {
        if let Some(token) = self.assemblies.get(name) {
            return Ok(*token);
        }

        let token = self.builder.add_assembly_ref(name)?;
        self.assemblies.insert(name.to_string(), token);

        Ok(token)
    }

    fn type_ref(&mut self, assembly: &str, namespace: &str, name: &str) -> Result<MetadataToken> {
        let key = (assembly.to_string(), namespace.to_string(), name.to_string());
        if let Some(token) = self.types.get(&key) {
            return Ok(*token);
        }

        let scope = self.assembly(assembly)?;
        let token = self.builder.add_type_ref(scope, namespace, name)?;
        self.types.insert(key, token);

        Ok(token)
    }

    pub fn depends_on(&mut self, name: &str) -> Result<&mut Self> {
        self.assembly(name)?;

        Ok(self)
    }

    /// Reference a platform type.
    pub fn uses_type(&mut self, namespace: &str, name: &str) -> Result<&mut Self> {
        self.type_ref("Xamarin.Mac", namespace, name)?;

        Ok(self)
    }

    /// Reference a platform method.
    pub fn calls(&mut self, namespace: &str, type_name: &str, method: &str) -> Result<&mut Self> {
        let parent = self.type_ref("Xamarin.Mac", namespace, type_name)?;
        self.builder
            .add_member_ref(parent, method, &[], ELEMENT_TYPE_VOID)?;

        Ok(self)
    }

    /// Reference the getter of a platform property.
    pub fn reads(&mut self, namespace: &str, type_name: &str, property: &str) -> Result<&mut Self> {
        let parent = self.type_ref("Xamarin.Mac", namespace, type_name)?;
        self.builder
            .add_member_ref(parent, &format!("get_{}", property), &[], ELEMENT_TYPE_I4)?;

        Ok(self)
    }

    /// Reference a platform field.
    pub fn loads(&mut self, namespace: &str, type_name: &str, field: &str) -> Result<&mut Self> {
        let parent = self.type_ref("Xamarin.Mac", namespace, type_name)?;
        self.builder.add_field_ref(parent, field, ELEMENT_TYPE_I4)?;

        Ok(self)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        Ok(self.builder.write_to(path)?)
    }
}

/// Write a bundle skeleton declaring `minimum_version`, returning its module directory.
pub fn write_bundle(root: &Path, minimum_version: Option<&str>) -> Result<std::path::PathBuf> {
    let contents = root.join("Contents");
    let mono = contents.join("MonoBundle");
    std::fs::create_dir_all(&mono)?;

    let mut dict = plist::Dictionary::new();
    dict.insert(
        "CFBundleExecutable".to_string(),
        plist::Value::String("MyApp".into()),
    );
    if let Some(version) = minimum_version {
        dict.insert(
            "LSMinimumSystemVersion".to_string(),
            plist::Value::String(version.into()),
        );
    }
    plist::Value::from(dict).to_file_xml(contents.join("Info.plist"))?;

    Ok(mono)
}
