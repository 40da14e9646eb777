// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Scan configuration and fixed bundle conventions. */

use {
    crate::version::PlatformVersion,
    std::path::{Path, PathBuf},
};

/// Location of the manifest relative to the bundle root.
pub const INFO_PLIST_PATH: &str = "Contents/Info.plist";

/// Default location of user modules relative to the bundle root.
pub const DEFAULT_MODULE_DIR: &str = "Contents/MonoBundle";

/// Manifest key declaring the minimum supported macOS version.
pub const MINIMUM_VERSION_KEY: &str = "LSMinimumSystemVersion";

/// Minimum version assumed when the manifest does not declare a usable one.
pub const FALLBACK_MINIMUM_VERSION: PlatformVersion = PlatformVersion::new(10, 7);

/// Name of the module carrying platform bindings and their availability attributes.
pub const PLATFORM_MODULE: &str = "Xamarin.Mac";

/// `ObjCRuntime.PlatformName.MacOSX`.
pub const PLATFORM_MACOSX: u8 = 1;

/// How the modules to audit are discovered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntrySelection {
    /// Start from the executable(s) in the module directory and follow references.
    SingleEntry,
    /// Scan every managed module anywhere in the bundle without following references.
    ScanAll,
}

/// Settings for a single bundle audit.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub bundle_path: PathBuf,
    /// Takes precedence over the manifest when set.
    pub minimum_version_override: Option<PlatformVersion>,
    pub entry_selection: EntrySelection,
    /// Bundle-relative module directory.
    pub module_dir_override: Option<PathBuf>,
    pub allow_multiple_entries: bool,
    pub verbose: bool,
    /// Extra directories probed when resolving referenced modules.
    pub additional_search_dirs: Vec<PathBuf>,
    pub platform_module: String,
    /// `PlatformName` value an `UnavailableAttribute` must carry to count.
    pub target_platform: u8,
}

impl ScanConfig {
    pub fn new(bundle_path: impl AsRef<Path>) -> Self {
        Self {
            bundle_path: bundle_path.as_ref().to_path_buf(),
            minimum_version_override: None,
            entry_selection: EntrySelection::SingleEntry,
            module_dir_override: None,
            allow_multiple_entries: false,
            verbose: false,
            additional_search_dirs: vec![],
            platform_module: PLATFORM_MODULE.to_string(),
            target_platform: PLATFORM_MACOSX,
        }
    }

    /// Absolute path of the directory holding user modules.
    pub fn module_dir(&self) -> PathBuf {
        match &self.module_dir_override {
            Some(dir) => self.bundle_path.join(dir),
            None => self.bundle_path.join(DEFAULT_MODULE_DIR),
        }
    }

    /// Path of the bundle's `Info.plist`.
    pub fn manifest_path(&self) -> PathBuf {
        self.bundle_path.join(INFO_PLIST_PATH)
    }
}
