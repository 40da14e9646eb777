// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Checking platform API uses against availability attributes. */

use {
    crate::{
        config::ScanConfig,
        graph::ResolvedModule,
        metadata::{ApiReference, AttributeData, MetadataReader},
        report::{Outcome, Violations},
        version::PlatformVersion,
        VersionCheckError,
    },
    clr_metadata::TypeName,
    log::{debug, info},
};

/// The availability attributes understood by the checker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttributeKind {
    /// `IntroducedAttribute(PlatformName platform, int major, int minor, ...)`
    Introduced,
    /// `UnavailableAttribute(PlatformName platform, ...)`
    Unavailable,
    Unrecognized,
}

impl AttributeKind {
    /// Classify an attribute by its simple type name.
    pub fn classify(type_name: &TypeName) -> Self {
        match type_name.name.as_str() {
            "IntroducedAttribute" => Self::Introduced,
            "UnavailableAttribute" => Self::Unavailable,
            _ => Self::Unrecognized,
        }
    }
}

/// What an availability attribute says about an API.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AvailabilityFact {
    IntroducedAt(PlatformVersion),
    Unavailable,
}

/// Interpret an attribute. `None` if it says nothing relevant or is malformed.
pub fn availability_fact(attribute: &AttributeData, target_platform: u8) -> Option<AvailabilityFact> {
    let component = |index: usize| {
        attribute
            .arguments
            .get(index)
            .and_then(|v| v.as_i64())
            .and_then(|v| u32::try_from(v).ok())
    };

    match AttributeKind::classify(&attribute.type_name) {
        AttributeKind::Introduced => match (component(1), component(2)) {
            (Some(major), Some(minor)) => Some(AvailabilityFact::IntroducedAt(
                PlatformVersion::new(major, minor),
            )),
            _ => {
                debug!("ignoring malformed {:?}", attribute);
                None
            }
        },
        AttributeKind::Unavailable => match attribute.arguments.first().and_then(|v| v.as_i64()) {
            Some(platform) if platform == i64::from(target_platform) => {
                Some(AvailabilityFact::Unavailable)
            }
            Some(_) => None,
            None => {
                debug!("ignoring malformed {:?}", attribute);
                None
            }
        },
        AttributeKind::Unrecognized => None,
    }
}

/// Attributes of the declaration `reference` points at.
fn lookup(
    reader: &mut dyn MetadataReader,
    reference: &ApiReference,
) -> Result<Option<Vec<AttributeData>>, VersionCheckError> {
    match &reference.member {
        None => reader.type_attributes(&reference.owner_module, &reference.declaring_type),
        Some(member) => {
            reader.member_attributes(&reference.owner_module, &reference.declaring_type, member)
        }
    }
}

/// Record the violations `attributes` imply for `reference`.
///
/// Returns whether any attribute carried an availability fact.
fn record(
    reference: &ApiReference,
    attributes: &[AttributeData],
    minimum: PlatformVersion,
    target_platform: u8,
    violations: &mut Violations,
) -> bool {
    let mut found = false;

    for attribute in attributes {
        match availability_fact(attribute, target_platform) {
            Some(AvailabilityFact::IntroducedAt(version)) => {
                found = true;
                if version > minimum {
                    violations.insert_if_absent(
                        reference.display_name(),
                        Outcome::IntroducedAfterMinimum(version),
                    );
                }
            }
            Some(AvailabilityFact::Unavailable) => {
                found = true;
                violations.insert_if_absent(reference.display_name(), Outcome::Unavailable);
            }
            None => {}
        }
    }

    found
}

/// Check every platform API used by `modules`.
///
/// Uses of APIs introduced after `minimum` or unavailable on the target
/// platform are violations. References whose declaration cannot be found
/// are skipped.
///
/// Members are looked up by their exact name. A property accessor without
/// availability attributes of its own is checked against its property.
pub fn check(
    modules: &[ResolvedModule],
    minimum: PlatformVersion,
    config: &ScanConfig,
    reader: &mut dyn MetadataReader,
) -> Result<Violations, VersionCheckError> {
    let mut violations = Violations::new();

    for module in modules {
        for reference in module
            .info
            .api_references
            .iter()
            .filter(|r| r.owner_module == config.platform_module)
        {
            let mut resolved = false;

            for candidate in std::iter::once(reference.clone()).chain(reference.accessed_property())
            {
                let attributes = match lookup(reader, &candidate)? {
                    Some(attributes) => attributes,
                    None => continue,
                };
                resolved = true;

                if record(
                    &candidate,
                    &attributes,
                    minimum,
                    config.target_platform,
                    &mut violations,
                ) {
                    break;
                }
            }

            if !resolved && config.verbose {
                info!("Unable to resolve: {}", reference);
            }
        }
    }

    Ok(violations)
}
