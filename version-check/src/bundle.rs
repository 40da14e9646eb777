// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Xamarin.Mac application bundles on the filesystem.

use {
    crate::{
        config::{EntrySelection, ScanConfig},
        VersionCheckError,
    },
    clr_metadata::ASSEMBLY_EXTENSIONS,
    log::warn,
    std::path::{Path, PathBuf},
    walkdir::WalkDir,
};

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// A validated application bundle.
///
/// Constructing an instance performs every check on the bundle layout, so
/// a scan never starts on an invalid bundle.
#[derive(Clone, Debug)]
pub struct AppBundle {
    /// Root directory of this bundle.
    root: PathBuf,

    /// Parsed `Info.plist` file, if one exists and is readable.
    info_plist: Option<plist::Dictionary>,

    /// Directory holding user modules.
    module_dir: PathBuf,

    /// Modules the scan starts from.
    root_modules: Vec<PathBuf>,
}

impl AppBundle {
    /// Open and validate the bundle described by a scan configuration.
    ///
    /// In single entry mode the bundle must have an `Info.plist` and a
    /// module directory holding exactly one executable, or at least one if
    /// multiple executables are allowed. In scan-all mode only the bundle
    /// directory needs to exist.
    pub fn open(config: &ScanConfig) -> Result<Self, VersionCheckError> {
        let root = config.bundle_path.clone();

        if !root.is_dir() {
            return Err(VersionCheckError::BundleNotFound(root));
        }

        if config.entry_selection == EntrySelection::ScanAll
            && config.module_dir_override.is_some()
        {
            return Err(VersionCheckError::ConflictingOptions);
        }

        let info_plist_path = config.manifest_path();
        let module_dir = config.module_dir();

        let root_modules = match config.entry_selection {
            EntrySelection::SingleEntry => {
                if !info_plist_path.is_file() {
                    return Err(VersionCheckError::ManifestNotFound(info_plist_path));
                }

                if !module_dir.is_dir() {
                    return Err(VersionCheckError::ModuleDirectoryNotFound(module_dir));
                }

                let entries = Self::find_executables(&module_dir)?;

                match entries.len() {
                    0 => return Err(VersionCheckError::NoEntryModules(module_dir)),
                    1 => {}
                    count if !config.allow_multiple_entries => {
                        return Err(VersionCheckError::MultipleEntryModules {
                            dir: module_dir,
                            count,
                        })
                    }
                    _ => {}
                }

                entries
            }
            EntrySelection::ScanAll => Self::find_managed_modules(&root)?,
        };

        let info_plist = if info_plist_path.is_file() {
            Self::read_info_plist(&info_plist_path)
        } else {
            None
        };

        Ok(Self {
            root,
            info_plist,
            module_dir,
            root_modules,
        })
    }

    fn read_info_plist(path: &Path) -> Option<plist::Dictionary> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!("unable to read {}: {}", path.display(), e);
                return None;
            }
        };

        let cursor = std::io::Cursor::new(data);

        match plist::Value::from_reader(cursor).map(|v| v.into_dictionary()) {
            Ok(Some(dict)) => Some(dict),
            Ok(None) => {
                warn!("{} is not a dictionary; ignoring it", path.display());
                None
            }
            Err(e) => {
                warn!("unable to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Executables directly inside a directory, sorted by file name.
    fn find_executables(dir: &Path) -> Result<Vec<PathBuf>, VersionCheckError> {
        let mut res = vec![];

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();

            if path.is_file() && has_extension(&path, &["exe"]) {
                res.push(path);
            }
        }

        res.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(res)
    }

    /// Every `.exe` and `.dll` file under a directory, in walk order.
    fn find_managed_modules(root: &Path) -> Result<Vec<PathBuf>, VersionCheckError> {
        let mut res = vec![];

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;

            if entry.file_type().is_file() && has_extension(entry.path(), &ASSEMBLY_EXTENSIONS) {
                res.push(entry.into_path());
            }
        }

        Ok(res)
    }

    /// The root directory of this bundle.
    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    /// Obtain the parsed `Info.plist` file.
    pub fn info_plist(&self) -> Option<&plist::Dictionary> {
        self.info_plist.as_ref()
    }

    /// The directory holding the bundle's managed modules.
    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Modules the scan starts from.
    ///
    /// These are the entry executables in single entry mode and every
    /// managed module of the bundle in scan-all mode.
    pub fn root_modules(&self) -> &[PathBuf] {
        &self.root_modules
    }
}
