// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! [MetadataReader] backed by `clr-metadata`. */

use {
    crate::{
        metadata::{ApiReference, AttributeData, MemberKind, MemberRef, MetadataReader, ModuleInfo},
        VersionCheckError,
    },
    clr_metadata::{
        Assembly, AssemblyResolver, ClrMetadataError, MemberSignature, MetadataToken, TypeName,
    },
    log::{debug, warn},
    std::{
        collections::HashMap,
        path::{Path, PathBuf},
    },
};

fn module_info(assembly: &Assembly, path: &Path) -> Result<ModuleInfo, ClrMetadataError> {
    let identity = match assembly.name()? {
        Some(name) => name,
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
    };

    let references = assembly
        .assembly_references()?
        .into_iter()
        .map(|r| r.name)
        .collect();

    let mut api_references = vec![];

    for reference in assembly.type_references()? {
        if let Some(owner) = reference.assembly_name() {
            api_references.push(ApiReference::to_type(owner, reference.name.clone()));
        }
    }

    for member in assembly.member_references()? {
        let parent = match member.parent.type_reference() {
            Some(parent) => parent,
            None => continue,
        };
        let owner = match parent.assembly_name() {
            Some(owner) => owner,
            None => continue,
        };

        match member.signature() {
            Ok(MemberSignature::Method(_)) => {
                api_references.push(ApiReference::to_member(
                    owner,
                    parent.name.clone(),
                    MemberRef::method(member.name.clone()),
                ));
            }
            Ok(MemberSignature::Field(_)) => {}
            Err(e) => {
                debug!(
                    "ignoring {} on {} with unreadable signature: {}",
                    member.name, parent.name, e
                );
            }
        }
    }

    Ok(ModuleInfo {
        identity,
        references,
        api_references,
    })
}

fn attributes(
    assembly: &Assembly,
    token: MetadataToken,
) -> Result<Vec<AttributeData>, ClrMetadataError> {
    let mut res = vec![];

    for attribute in assembly.custom_attributes(token)? {
        let type_name = match assembly.attribute_type(&attribute)? {
            Some(name) => name,
            None => continue,
        };

        match assembly.attribute_arguments(&attribute) {
            Ok(arguments) => res.push(AttributeData {
                type_name,
                arguments,
            }),
            Err(e) => {
                debug!("ignoring undecodable {} on {}: {}", type_name, token, e);
            }
        }
    }

    Ok(res)
}

/// Reads modules from disk and resolves platform declarations by module name.
///
/// Opened platform modules are cached for the lifetime of the reader.
#[derive(Debug, Default)]
pub struct ClrMetadataReader {
    resolver: AssemblyResolver,
    modules: HashMap<String, Option<Assembly>>,
}

impl ClrMetadataReader {
    pub fn new(search_directories: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            resolver: AssemblyResolver::new(search_directories),
            modules: HashMap::new(),
        }
    }

    /// Find a module by name. A module that cannot be found or read is reported once.
    fn module(&mut self, name: &str) -> Option<&Assembly> {
        if !self.modules.contains_key(name) {
            let assembly = match self.resolver.find(name) {
                Some(path) => match Assembly::from_path(&path) {
                    Ok(assembly) => Some(assembly),
                    Err(e) => {
                        warn!("unable to read {}: {}", path.display(), e);
                        None
                    }
                },
                None => {
                    warn!(
                        "unable to locate {} in {}; its APIs will not be checked",
                        name,
                        self.resolver
                            .search_directories()
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    None
                }
            };

            self.modules.insert(name.to_string(), assembly);
        }

        self.modules.get(name).and_then(|a| a.as_ref())
    }
}

fn metadata_error(assembly: &Assembly, e: ClrMetadataError) -> VersionCheckError {
    let path = assembly.path().map(|p| p.to_path_buf()).unwrap_or_default();

    VersionCheckError::Metadata(path, e)
}

impl MetadataReader for ClrMetadataReader {
    fn read_module(&mut self, path: &Path) -> Result<ModuleInfo, VersionCheckError> {
        let wrap = |e| VersionCheckError::Metadata(path.to_path_buf(), e);

        let assembly = Assembly::from_path(path).map_err(wrap)?;

        module_info(&assembly, path).map_err(wrap)
    }

    fn add_search_directory(&mut self, directory: &Path) {
        self.resolver.add_search_directory(directory);
    }

    fn type_attributes(
        &mut self,
        module: &str,
        type_name: &TypeName,
    ) -> Result<Option<Vec<AttributeData>>, VersionCheckError> {
        let assembly = match self.module(module) {
            Some(assembly) => assembly,
            None => return Ok(None),
        };
        let error = |e| metadata_error(assembly, e);

        match assembly.find_type(type_name).map_err(&error)? {
            Some(token) => Ok(Some(attributes(assembly, token).map_err(&error)?)),
            None => Ok(None),
        }
    }

    fn member_attributes(
        &mut self,
        module: &str,
        type_name: &TypeName,
        member: &MemberRef,
    ) -> Result<Option<Vec<AttributeData>>, VersionCheckError> {
        let assembly = match self.module(module) {
            Some(assembly) => assembly,
            None => return Ok(None),
        };
        let error = |e| metadata_error(assembly, e);

        let declaring_type = match assembly.find_type(type_name).map_err(&error)? {
            Some(token) => token,
            None => return Ok(None),
        };

        let token = match member.kind {
            MemberKind::Method => assembly
                .methods(declaring_type.row)
                .map_err(&error)?
                .into_iter()
                .find(|m| m.name == member.name)
                .map(|m| m.token),
            MemberKind::Property => assembly
                .properties(declaring_type.row)
                .map_err(&error)?
                .into_iter()
                .find(|p| p.name == member.name)
                .map(|p| p.token),
        };

        match token {
            Some(token) => Ok(Some(attributes(assembly, token).map_err(&error)?)),
            None => Ok(None),
        }
    }
}
