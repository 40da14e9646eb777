// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::Result,
    assert_cmd::Command,
    clr_metadata::{
        builder::AssemblyBuilder,
        signature::{ELEMENT_TYPE_I4, ELEMENT_TYPE_U1, ELEMENT_TYPE_VOID},
        AttributeValue, SigType,
    },
    predicates::prelude::*,
    std::path::{Path, PathBuf},
};

/// Write `Xamarin.Mac.dll` declaring `AppKit.NSView.Draw`, introduced in 10.12.
fn write_platform(dir: &Path) -> Result<()> {
    let mut platform = AssemblyBuilder::new("Xamarin.Mac");
    let platform_name = platform.add_enum("ObjCRuntime", "PlatformName", ELEMENT_TYPE_U1)?;
    let introduced = platform.add_attribute_type(
        "ObjCRuntime",
        "IntroducedAttribute",
        &[
            SigType::ValueType(platform_name),
            SigType::Primitive(ELEMENT_TYPE_I4),
            SigType::Primitive(ELEMENT_TYPE_I4),
        ],
    )?;
    platform.add_type("AppKit", "NSView")?;
    let draw = platform.add_method("Draw", &[], ELEMENT_TYPE_VOID)?;
    platform.add_method("Layout", &[], ELEMENT_TYPE_VOID)?;
    platform.add_custom_attribute(
        draw,
        introduced,
        &[
            AttributeValue::UInt(1),
            AttributeValue::Int(10),
            AttributeValue::Int(12),
        ],
    )?;

    platform.write_to(dir.join("Xamarin.Mac.dll"))?;

    Ok(())
}

/// Write an executable calling `AppKit.NSView.<method>`.
fn write_app(path: &Path, method: &str) -> Result<()> {
    let mut app = AssemblyBuilder::new("MyApp");
    let xamarin_mac = app.add_assembly_ref("Xamarin.Mac")?;
    let view = app.add_type_ref(xamarin_mac, "AppKit", "NSView")?;
    app.add_member_ref(view, method, &[], ELEMENT_TYPE_VOID)?;

    app.write_to(path)?;

    Ok(())
}

/// Create `MyApp.app` declaring a 10.9 minimum, returning the bundle and module directory.
fn write_bundle(root: &Path) -> Result<(PathBuf, PathBuf)> {
    write_bundle_with_minimum(root, Some("10.9"))
}

fn write_bundle_with_minimum(root: &Path, minimum: Option<&str>) -> Result<(PathBuf, PathBuf)> {
    let bundle = root.join("MyApp.app");
    let mono = bundle.join("Contents").join("MonoBundle");
    std::fs::create_dir_all(&mono)?;

    let mut dict = plist::Dictionary::new();
    if let Some(minimum) = minimum {
        dict.insert(
            "LSMinimumSystemVersion".to_string(),
            plist::Value::String(minimum.into()),
        );
    }
    plist::Value::from(dict).to_file_xml(bundle.join("Contents").join("Info.plist"))?;

    write_platform(&mono)?;

    Ok((bundle, mono))
}

fn tempdir() -> Result<tempfile::TempDir> {
    Ok(tempfile::Builder::new()
        .prefix("version-check-test-")
        .tempdir()?)
}

#[test]
fn violations() -> Result<()> {
    let td = tempdir()?;
    let (bundle, mono) = write_bundle(td.path())?;
    write_app(&mono.join("MyApp.exe"), "Draw")?;

    Command::cargo_bin("version-check")?
        .arg(&bundle)
        .assert()
        .code(1)
        .stdout(predicate::eq("NSView.Draw was introduced in 10.12\n").normalize());

    Command::cargo_bin("version-check")?
        .arg("--min-version")
        .arg("10.12")
        .arg(&bundle)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    Ok(())
}

#[test]
fn clean_bundle() -> Result<()> {
    let td = tempdir()?;
    let (bundle, mono) = write_bundle(td.path())?;
    write_app(&mono.join("MyApp.exe"), "Layout")?;

    Command::cargo_bin("version-check")?
        .arg("-v")
        .arg(&bundle)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Minimum Version - 10.9"))
        .stderr(predicate::str::contains("Resolving MyApp"));

    Ok(())
}

#[test]
fn missing_minimum_version() -> Result<()> {
    let td = tempdir()?;
    let (bundle, mono) = write_bundle_with_minimum(td.path(), None)?;
    write_app(&mono.join("MyApp.exe"), "Draw")?;

    Command::cargo_bin("version-check")?
        .arg(&bundle)
        .assert()
        .code(1)
        .stdout(predicate::eq("NSView.Draw was introduced in 10.12\n").normalize())
        .stderr(predicate::str::contains(
            "Unable to find LSMinimumSystemVersion in Info.plist. Assuming 10.7",
        ));

    Ok(())
}

#[test]
fn missing_dependency() -> Result<()> {
    let td = tempdir()?;
    let (bundle, mono) = write_bundle(td.path())?;

    let mut app = AssemblyBuilder::new("MyApp");
    app.add_assembly_ref("MyLib")?;
    app.write_to(mono.join("MyApp.exe"))?;

    Command::cargo_bin("version-check")?
        .arg("-v")
        .arg(&bundle)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Found Dependency MyLib"))
        .stderr(predicate::str::contains("Unable to find dependency MyLib, skipping"));

    // Not reported without verbose output.
    Command::cargo_bin("version-check")?
        .arg(&bundle)
        .assert()
        .success()
        .stderr(predicate::str::contains("Unable to find dependency").not());

    Ok(())
}

#[test]
fn search_directory() -> Result<()> {
    let td = tempdir()?;
    let (bundle, mono) = write_bundle(td.path())?;
    write_app(&mono.join("MyApp.exe"), "Draw")?;

    let sdk = td.path().join("sdk");
    std::fs::create_dir_all(&sdk)?;
    std::fs::rename(mono.join("Xamarin.Mac.dll"), sdk.join("Xamarin.Mac.dll"))?;

    // Without the platform module nothing can be checked.
    Command::cargo_bin("version-check")?
        .arg(&bundle)
        .assert()
        .success()
        .stderr(predicate::str::contains("Xamarin.Mac"));

    Command::cargo_bin("version-check")?
        .arg("--search-dir")
        .arg(&sdk)
        .arg(&bundle)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("NSView.Draw"));

    Ok(())
}

#[test]
fn invalid_bundles() -> Result<()> {
    let td = tempdir()?;

    Command::cargo_bin("version-check")?
        .arg(td.path().join("Missing.app"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"))
        .stderr(predicate::str::contains("Usage"));

    let (bundle, mono) = write_bundle(td.path())?;

    Command::cargo_bin("version-check")?
        .arg(&bundle)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no executable found"));

    write_app(&mono.join("MyApp.exe"), "Draw")?;
    write_app(&mono.join("Other.exe"), "Draw")?;

    Command::cargo_bin("version-check")?
        .arg(&bundle)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--allow-multiple-executables"));

    Command::cargo_bin("version-check")?
        .arg("--allow-multiple-executables")
        .arg(&bundle)
        .assert()
        .code(1);

    Ok(())
}

#[test]
fn usage_errors() -> Result<()> {
    Command::cargo_bin("version-check")?
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage"));

    Command::cargo_bin("version-check")?
        .arg("--scan-all")
        .arg("--managed-path")
        .arg("Contents/Resources")
        .arg("MyApp.app")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));

    Ok(())
}
