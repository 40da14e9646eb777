// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Modules that belong to the platform or runtime and are never audited. */

/// Module names excluded by exact match.
pub const EXCLUDED_MODULES: &[&str] = &[
    "mscorlib",
    "netstandard",
    "Xamarin.Mac",
    "gtk-sharp",
    "gdk-sharp",
    "glib-sharp",
    "pango-sharp",
    "atk-sharp",
    "Xwt",
    "Microsoft.CSharp",
    "Mono.Posix",
    "Mono.Cairo",
];

/// Module name prefixes excluded wholesale.
pub const EXCLUDED_PREFIXES: &[&str] = &["System", "Microsoft.Build"];

/// Whether a module is part of the platform or runtime rather than user code.
pub fn is_excluded(name: &str) -> bool {
    EXCLUDED_MODULES.contains(&name)
        || EXCLUDED_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exclusions() {
        for name in [
            "mscorlib",
            "Xamarin.Mac",
            "Xwt",
            "Mono.Posix",
            "System",
            "System.Core",
            "System.Net.Http",
            "SystemConfiguration",
            "Microsoft.Build.Framework",
        ] {
            assert!(is_excluded(name), "{} should be excluded", name);
        }

        for name in [
            "MyApp",
            "Newtonsoft.Json",
            "Microsoft.Extensions.Logging",
            "mscorlib.Extensions",
            "xamarin.mac",
            "Mono.Addins",
            "",
        ] {
            assert!(!is_excluded(name), "{} should not be excluded", name);
        }
    }

    #[test]
    fn deterministic() {
        for name in ["System.Xml", "MyLib", "Xwt"] {
            assert_eq!(is_excluded(name), is_excluded(name));
        }
    }
}
