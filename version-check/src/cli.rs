// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::Result,
    bundle_version_check::{
        config::{EntrySelection, ScanConfig},
        report::report,
        scan,
        version::PlatformVersion,
    },
    clap::{Arg, ArgAction, ArgMatches, Command},
    log::LevelFilter,
    std::path::PathBuf,
};

const VERSION_CHECK_VERSION: &str = env!("CARGO_PKG_VERSION");

const ABOUT: &str = "\
Check a Xamarin.Mac application bundle for uses of platform APIs that
are unavailable on macOS or were introduced after the bundle's declared
minimum system version (LSMinimumSystemVersion in Contents/Info.plist).

Each violation is printed on its own line. The exit code is 0 when no
violations are found, 1 when there are violations and 2 when the bundle
or the arguments are invalid.
";

fn command() -> Command {
    Command::new("version-check")
        .version(VERSION_CHECK_VERSION)
        .about("Find platform API uses newer than a bundle's minimum macOS version")
        .long_about(ABOUT)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Display verbose details. Can be specified multiple times."),
        )
        .arg(
            Arg::new("managed-path")
                .long("managed-path")
                .short('m')
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .conflicts_with("scan-all")
                .help("Bundle relative directory holding user modules (default Contents/MonoBundle)"),
        )
        .arg(
            Arg::new("allow-multiple-executables")
                .long("allow-multiple-executables")
                .action(ArgAction::SetTrue)
                .help("Scan every executable in the managed directory instead of requiring one"),
        )
        .arg(
            Arg::new("scan-all")
                .long("scan-all")
                .action(ArgAction::SetTrue)
                .help("Scan every .exe and .dll in the bundle without following references"),
        )
        .arg(
            Arg::new("min-version")
                .long("min-version")
                .value_name("X.Y")
                .value_parser(|s: &str| s.parse::<PlatformVersion>().map_err(|e| e.to_string()))
                .help("Minimum macOS version to check against instead of the Info.plist value"),
        )
        .arg(
            Arg::new("search-dir")
                .long("search-dir")
                .short('d')
                .value_name("DIR")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Additional directory for locating referenced modules such as Xamarin.Mac.dll"),
        )
        .arg(
            Arg::new("bundle")
                .required(true)
                .value_name("BUNDLE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Path to the .app bundle to check"),
        )
}

fn config_from_matches(matches: &ArgMatches) -> ScanConfig {
    let bundle = matches
        .get_one::<PathBuf>("bundle")
        .cloned()
        .unwrap_or_default();

    let mut config = ScanConfig::new(bundle);
    config.verbose = matches.get_count("verbose") > 0;
    config.minimum_version_override = matches.get_one::<PlatformVersion>("min-version").copied();
    config.module_dir_override = matches.get_one::<PathBuf>("managed-path").cloned();
    config.allow_multiple_entries = matches.get_flag("allow-multiple-executables");
    config.additional_search_dirs = matches
        .get_many::<PathBuf>("search-dir")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    if matches.get_flag("scan-all") {
        config.entry_selection = EntrySelection::ScanAll;
    }

    config
}

fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();
}

pub fn run() -> Result<i32> {
    let matches = command().get_matches();

    init_logging(matches.get_count("verbose"));

    let config = config_from_matches(&matches);

    match scan(&config) {
        Ok(violations) => Ok(report(&violations, &mut std::io::stdout().lock())?),
        Err(e) if e.is_configuration() => {
            eprintln!("error: {}\n", e);
            eprintln!("{}", command().render_help());
            Ok(2)
        }
        Err(e) => Err(e.into()),
    }
}
