// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {clr_metadata::ClrMetadataError, std::path::PathBuf, thiserror::Error};

/// Unified error type for bundle auditing.
#[derive(Debug, Error)]
pub enum VersionCheckError {
    #[error("bundle path {} does not exist or is not a directory", .0.display())]
    BundleNotFound(PathBuf),

    #[error("Info.plist not found at {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("managed assembly directory {} does not exist", .0.display())]
    ModuleDirectoryNotFound(PathBuf),

    #[error("no executable found in {}", .0.display())]
    NoEntryModules(PathBuf),

    #[error("found {count} executables in {}; pass --allow-multiple-executables to scan all of them", .dir.display())]
    MultipleEntryModules { dir: PathBuf, count: usize },

    #[error("--managed-path cannot be combined with --scan-all")]
    ConflictingOptions,

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("metadata error in {}: {}", .0.display(), .1)]
    Metadata(PathBuf, ClrMetadataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error walking bundle: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl VersionCheckError {
    /// Whether the error stems from invalid input rather than a failed scan.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::BundleNotFound(_)
                | Self::ManifestNotFound(_)
                | Self::ModuleDirectoryNotFound(_)
                | Self::NoEntryModules(_)
                | Self::MultipleEntryModules { .. }
                | Self::ConflictingOptions
                | Self::InvalidVersion(_)
        )
    }
}
