// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Discovering the user modules of a bundle.

In single entry mode, the module graph is walked from the entry
executables by following assembly references into the module directory.
In scan-all mode every module found in the bundle is taken as is.

Platform and runtime modules (see [crate::exclusion]) are never part of
the result, and every module identity appears at most once.
*/

use {
    crate::{
        config::{EntrySelection, ScanConfig},
        exclusion::is_excluded,
        metadata::{MetadataReader, ModuleInfo},
        VersionCheckError,
    },
    clr_metadata::AssemblyResolver,
    log::{debug, info},
    std::{
        collections::HashSet,
        fmt::Display,
        path::{Path, PathBuf},
    },
};

/// The name identifying a module. Case sensitive.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ModuleIdentity(String);

impl ModuleIdentity {
    pub fn new(name: impl ToString) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ModuleIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user module selected for auditing.
#[derive(Clone, Debug)]
pub struct ResolvedModule {
    pub identity: ModuleIdentity,
    pub path: PathBuf,
    pub info: ModuleInfo,
}

fn open_module(
    reader: &mut dyn MetadataReader,
    path: &Path,
    verbose: bool,
) -> Option<ResolvedModule> {
    match reader.read_module(path) {
        Ok(info) => Some(ResolvedModule {
            identity: ModuleIdentity::new(&info.identity),
            path: path.to_path_buf(),
            info,
        }),
        Err(e) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            if verbose {
                info!("\t\tUnable to find dependency {}, skipping. {}", name, e);
            } else {
                debug!("skipping {}: {}", path.display(), e);
            }

            None
        }
    }
}

/// Resolve the user modules to audit, starting from `roots`.
///
/// `roots` are the entry executables in single entry mode and every
/// module of the bundle in scan-all mode. Directories used for locating
/// referenced modules are registered with `reader` along the way.
///
/// Modules that cannot be found or read are logged and skipped.
pub fn resolve(
    config: &ScanConfig,
    roots: &[PathBuf],
    reader: &mut dyn MetadataReader,
) -> Result<Vec<ResolvedModule>, VersionCheckError> {
    let verbose = config.verbose;
    let follow_references = config.entry_selection == EntrySelection::SingleEntry;

    let mut search_directories = vec![];
    if follow_references {
        search_directories.push(config.module_dir());
    } else {
        for root in roots {
            if let Some(parent) = root.parent() {
                if !search_directories.iter().any(|d| d == parent) {
                    search_directories.push(parent.to_path_buf());
                }
            }
        }
    }

    for directory in search_directories.iter().chain(&config.additional_search_dirs) {
        reader.add_search_directory(directory);
    }

    let locator = AssemblyResolver::new([config.module_dir()]);

    // Popped from the back, so roots are pushed in reverse to visit them in order.
    let mut stack = roots
        .iter()
        .rev()
        .filter_map(|path| open_module(reader, path, verbose))
        .collect::<Vec<_>>();

    let mut seen = HashSet::new();
    let mut res = vec![];

    while let Some(current) = stack.pop() {
        if seen.contains(&current.identity) || is_excluded(current.identity.as_str()) {
            continue;
        }

        if verbose {
            info!("Resolving {}", current.identity);
        }

        if follow_references {
            for dependency in current.info.references.iter().filter(|n| !is_excluded(n)) {
                if verbose {
                    info!("\tFound Dependency {}", dependency);
                }

                if seen.contains(&ModuleIdentity::new(dependency)) {
                    continue;
                }

                match locator.find(dependency) {
                    Some(path) => {
                        if let Some(module) = open_module(reader, &path, verbose) {
                            stack.push(module);
                        }
                    }
                    None => {
                        if verbose {
                            info!("\t\tUnable to find dependency {}, skipping", dependency);
                        }
                    }
                }
            }
        }

        seen.insert(current.identity.clone());
        res.push(current);
    }

    if verbose {
        info!(
            "User Assemblies Resolved: {}",
            res.iter()
                .map(|m| m.identity.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    Ok(res)
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::metadata::{AttributeData, MemberRef},
        anyhow::Result,
        clr_metadata::TypeName,
        std::collections::HashMap,
    };

    /// Serves module metadata from memory, keyed by file name.
    #[derive(Default)]
    struct FakeReader {
        modules: HashMap<String, ModuleInfo>,
        search_directories: Vec<PathBuf>,
        reads: Vec<String>,
    }

    impl FakeReader {
        fn add(&mut self, file_name: &str, identity: &str, references: &[&str]) {
            self.modules.insert(
                file_name.to_string(),
                ModuleInfo {
                    identity: identity.to_string(),
                    references: references.iter().map(|s| s.to_string()).collect(),
                    api_references: vec![],
                },
            );
        }
    }

    impl MetadataReader for FakeReader {
        fn read_module(&mut self, path: &Path) -> Result<ModuleInfo, VersionCheckError> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.reads.push(name.clone());

            self.modules.get(&name).cloned().ok_or_else(|| {
                VersionCheckError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "not a managed module",
                ))
            })
        }

        fn add_search_directory(&mut self, directory: &Path) {
            self.search_directories.push(directory.to_path_buf());
        }

        fn type_attributes(
            &mut self,
            _module: &str,
            _type_name: &TypeName,
        ) -> Result<Option<Vec<AttributeData>>, VersionCheckError> {
            Ok(None)
        }

        fn member_attributes(
            &mut self,
            _module: &str,
            _type_name: &TypeName,
            _member: &MemberRef,
        ) -> Result<Option<Vec<AttributeData>>, VersionCheckError> {
            Ok(None)
        }
    }

    fn identities(modules: &[ResolvedModule]) -> Vec<&str> {
        modules.iter().map(|m| m.identity.as_str()).collect()
    }

    fn bundle(files: &[&str]) -> Result<(tempfile::TempDir, ScanConfig)> {
        let td = tempfile::Builder::new()
            .prefix("version-check-test-")
            .tempdir()?;
        let config = ScanConfig::new(td.path());
        std::fs::create_dir_all(config.module_dir())?;

        for file in files {
            std::fs::write(config.module_dir().join(file), b"")?;
        }

        Ok((td, config))
    }

    #[test]
    fn follows_references() -> Result<()> {
        let (_td, config) = bundle(&["App.exe", "A.dll", "B.dll", "System.Json.dll"])?;

        let mut reader = FakeReader::default();
        reader.add("App.exe", "App", &["A", "mscorlib", "Missing"]);
        reader.add("A.dll", "A", &["B", "System.Json", "Xamarin.Mac"]);
        reader.add("B.dll", "B", &[]);
        reader.add("System.Json.dll", "System.Json", &[]);

        let modules = resolve(&config, &[config.module_dir().join("App.exe")], &mut reader)?;
        assert_eq!(identities(&modules), vec!["App", "A", "B"]);
        assert_eq!(modules[1].path, config.module_dir().join("A.dll"));
        assert!(!reader.reads.contains(&"System.Json.dll".to_string()));
        assert_eq!(reader.search_directories, vec![config.module_dir()]);

        Ok(())
    }

    #[test]
    fn cycles_and_diamonds() -> Result<()> {
        let (_td, config) = bundle(&["App.exe", "A.dll", "B.dll", "C.dll"])?;

        let mut reader = FakeReader::default();
        reader.add("App.exe", "App", &["A", "B"]);
        reader.add("A.dll", "A", &["C", "App"]);
        reader.add("B.dll", "B", &["C"]);
        reader.add("C.dll", "C", &["A"]);

        let modules = resolve(&config, &[config.module_dir().join("App.exe")], &mut reader)?;

        let mut names = identities(&modules);
        assert_eq!(names[0], "App");
        names.sort_unstable();
        assert_eq!(names, vec!["A", "App", "B", "C"]);

        Ok(())
    }

    #[test]
    fn unreadable_modules() -> Result<()> {
        let (_td, config) = bundle(&["App.exe", "Native.dll"])?;

        let mut reader = FakeReader::default();
        reader.add("App.exe", "App", &["Native"]);

        let modules = resolve(&config, &[config.module_dir().join("App.exe")], &mut reader)?;
        assert_eq!(identities(&modules), vec!["App"]);

        let modules = resolve(
            &config,
            &[config.module_dir().join("Native.dll")],
            &mut reader,
        )?;
        assert!(modules.is_empty());

        Ok(())
    }

    #[test]
    fn multiple_entries() -> Result<()> {
        let (_td, config) = bundle(&["App.exe", "Tool.exe", "Shared.dll"])?;

        let mut reader = FakeReader::default();
        reader.add("App.exe", "App", &["Shared"]);
        reader.add("Tool.exe", "Tool", &["Shared"]);
        reader.add("Shared.dll", "Shared", &[]);

        let roots = [
            config.module_dir().join("App.exe"),
            config.module_dir().join("Tool.exe"),
        ];
        let modules = resolve(&config, &roots, &mut reader)?;
        assert_eq!(identities(&modules), vec!["App", "Shared", "Tool"]);

        Ok(())
    }

    #[test]
    fn scan_all_does_not_follow() -> Result<()> {
        let (td, mut config) = bundle(&["App.exe", "A.dll", "Xamarin.Mac.dll"])?;
        config.entry_selection = EntrySelection::ScanAll;
        config.additional_search_dirs = vec![PathBuf::from("/opt/xamarin")];

        let plugins = td.path().join("Contents").join("PlugIns");
        std::fs::create_dir_all(&plugins)?;
        std::fs::write(plugins.join("Plugin.dll"), b"")?;

        let mut reader = FakeReader::default();
        reader.add("App.exe", "App", &["A", "B"]);
        reader.add("A.dll", "A", &[]);
        reader.add("Xamarin.Mac.dll", "Xamarin.Mac", &[]);
        reader.add("Plugin.dll", "Plugin", &["B"]);

        let roots = [
            config.module_dir().join("A.dll"),
            config.module_dir().join("App.exe"),
            config.module_dir().join("Xamarin.Mac.dll"),
            plugins.join("Plugin.dll"),
            // The same module twice.
            config.module_dir().join("A.dll"),
        ];

        let modules = resolve(&config, &roots, &mut reader)?;
        assert_eq!(identities(&modules), vec!["A", "App", "Plugin"]);
        assert_eq!(
            reader.search_directories,
            vec![config.module_dir(), plugins, PathBuf::from("/opt/xamarin")]
        );

        Ok(())
    }
}
