// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Locating referenced assemblies on disk. */

use {
    crate::{Assembly, ClrMetadataError},
    log::debug,
    std::path::{Path, PathBuf},
};

/// File extensions probed for an assembly name, in order.
pub const ASSEMBLY_EXTENSIONS: [&str; 2] = ["dll", "exe"];

/// Finds assemblies by name in an ordered list of directories.
#[derive(Clone, Debug, Default)]
pub struct AssemblyResolver {
    search_directories: Vec<PathBuf>,
}

impl AssemblyResolver {
    pub fn new(search_directories: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut resolver = Self::default();
        for directory in search_directories {
            resolver.add_search_directory(directory);
        }

        resolver
    }

    /// Append a directory to search. Duplicates are ignored.
    pub fn add_search_directory(&mut self, directory: impl AsRef<Path>) {
        let directory = directory.as_ref();

        if !self.search_directories.iter().any(|d| d == directory) {
            self.search_directories.push(directory.to_path_buf());
        }
    }

    pub fn search_directories(&self) -> &[PathBuf] {
        &self.search_directories
    }

    /// Find the file for an assembly name.
    ///
    /// For every directory in order, `<name>.dll` is tried before `<name>.exe`.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        self.search_directories.iter().find_map(|directory| {
            ASSEMBLY_EXTENSIONS.iter().find_map(|extension| {
                let path = directory.join(format!("{}.{}", name, extension));

                if path.is_file() {
                    Some(path)
                } else {
                    None
                }
            })
        })
    }

    /// Find and open an assembly by name.
    ///
    /// Returns `Ok(None)` if no file exists for the name.
    pub fn open(&self, name: &str) -> Result<Option<Assembly>, ClrMetadataError> {
        match self.find(name) {
            Some(path) => {
                debug!("resolved {} to {}", name, path.display());
                Ok(Some(Assembly::from_path(path)?))
            }
            None => Ok(None),
        }
    }
}
