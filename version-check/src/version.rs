// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Platform versions and the bundle's declared minimum. */

use {
    crate::{
        config::{ScanConfig, FALLBACK_MINIMUM_VERSION, MINIMUM_VERSION_KEY},
        VersionCheckError,
    },
    log::{info, warn},
    std::{fmt::Display, str::FromStr},
};

/// A `major.minor` operating system version.
///
/// Ordering compares the major component, then the minor component.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
}

impl PlatformVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Display for PlatformVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PlatformVersion {
    type Err = VersionCheckError;

    /// Parse `major.minor[.build[.revision]]`. Build and revision are dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionCheckError::InvalidVersion(s.to_string());

        let components = s
            .trim()
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    Err(invalid())
                } else {
                    part.parse::<u32>().map_err(|_| invalid())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        match components.as_slice() {
            [major, minor] | [major, minor, _] | [major, minor, _, _] => {
                Ok(Self::new(*major, *minor))
            }
            _ => Err(invalid()),
        }
    }
}

/// Determine the minimum platform version a bundle must support.
///
/// The configured override wins. Otherwise `LSMinimumSystemVersion` is read
/// from the manifest. A missing manifest, missing key or unparseable value
/// falls back to 10.7 with a warning.
pub fn resolve_minimum_version(
    manifest: Option<&plist::Dictionary>,
    config: &ScanConfig,
) -> PlatformVersion {
    if let Some(version) = config.minimum_version_override {
        if config.verbose {
            info!("Minimum Version - {} (overridden)", version);
        }
        return version;
    }

    let value = match manifest.and_then(|dict| dict.get(MINIMUM_VERSION_KEY)) {
        Some(value) => value,
        None => {
            warn!(
                "Unable to find {} in Info.plist. Assuming {}",
                MINIMUM_VERSION_KEY, FALLBACK_MINIMUM_VERSION
            );
            return FALLBACK_MINIMUM_VERSION;
        }
    };

    match value.as_string().map(PlatformVersion::from_str) {
        Some(Ok(version)) => {
            if config.verbose {
                info!("Minimum Version - {}", version);
            }
            version
        }
        _ => {
            warn!(
                "Unable to parse {} in Info.plist. Assuming {}",
                MINIMUM_VERSION_KEY, FALLBACK_MINIMUM_VERSION
            );
            FALLBACK_MINIMUM_VERSION
        }
    }
}
