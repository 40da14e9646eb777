// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Audit Xamarin.Mac application bundles for platform API availability.

A bundle declares the oldest macOS version it supports through
`LSMinimumSystemVersion` in its `Info.plist`. Platform bindings in
`Xamarin.Mac.dll` carry `IntroducedAttribute` and `UnavailableAttribute`
metadata. This crate finds the user modules of a bundle and reports every
platform API they reference that is newer than the declared minimum, or
unavailable on macOS altogether.

[scan] runs the whole pipeline for a [config::ScanConfig]:

1. [bundle::AppBundle::open] validates the bundle layout.
2. [version::resolve_minimum_version] determines the minimum version.
3. [graph::resolve] finds the user modules.
4. [checker::check] cross-references their platform API uses.

[report::report] renders the resulting [report::Violations].
*/

pub mod bundle;
pub mod checker;
pub mod clr;
pub mod config;
mod error;
pub use error::*;
pub mod exclusion;
pub mod graph;
pub mod metadata;
pub mod report;
#[cfg(test)]
mod testutil;
pub mod version;

use {
    crate::{
        bundle::AppBundle, checker::check, clr::ClrMetadataReader, config::ScanConfig,
        graph::resolve, report::Violations, version::resolve_minimum_version,
    },
    log::info,
};

/// Audit the bundle described by `config`.
pub fn scan(config: &ScanConfig) -> Result<Violations, VersionCheckError> {
    let bundle = AppBundle::open(config)?;

    let minimum = resolve_minimum_version(bundle.info_plist(), config);

    let mut reader = ClrMetadataReader::default();
    let modules = resolve(config, bundle.root_modules(), &mut reader)?;

    let violations = check(&modules, minimum, config, &mut reader)?;

    if config.verbose {
        info!(
            "{} violation(s) in {} module(s) of {}",
            violations.len(),
            modules.len(),
            bundle.root_dir().display()
        );
    }

    Ok(violations)
}
