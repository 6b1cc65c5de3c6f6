//! End-to-end tests for the firmsync binary
//!
//! Each test serves a manifest and release archives from a temporary
//! directory through `file://` URLs, so no network access is needed.

use assert_cmd::Command;
use flate2::Compression;
use flate2::write::GzEncoder;
use md5::{Digest, Md5};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const CONFIG_VARS: [&str; 11] = [
    "FIRMSYNC_CONFIG",
    "MANIFEST",
    "FIRMWARE_DIR",
    "CACHE_DIR",
    "INCLUDE_MODELS",
    "INCLUDE_FILES",
    "EXCLUDE_MODELS",
    "EXCLUDE_FILES",
    "FLATTEN",
    "LATEST",
    "RUST_LOG",
];

/// A firmware distribution laid out in a temporary directory.
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Result<Self, std::io::Error> {
        let dir = TempDir::new()?;
        for sub in ["dist", "firmware", "cache"] {
            fs::create_dir_all(dir.path().join(sub))?;
        }
        fs::write(dir.path().join("config.json"), "{}")?;
        Ok(Self { dir })
    }

    fn path(&self, sub: &str) -> PathBuf {
        self.dir.path().join(sub)
    }

    /// Write a release tarball into `dist/` and return its md5.
    fn publish(&self, tarball: &str, files: &[(&str, &[u8])]) -> Result<String, std::io::Error> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(1_600_000_000);
            header.set_cksum();
            builder.append_data(&mut header, name, *data)?;
        }
        let bytes = builder.into_inner()?.finish()?;
        fs::write(self.path("dist").join(tarball), &bytes)?;
        Ok(hex::encode(Md5::digest(&bytes)))
    }

    /// Write `manifest.json` listing `releases` as `(version, md5, models)`.
    fn manifest(&self, releases: &[(&str, &str, &[&str])]) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let origin = url::Url::from_directory_path(self.path("dist"))
            .map_err(|()| "dist is not an absolute path")?;
        let releases: Vec<_> = releases
            .iter()
            .map(|(version, md5sum, models)| {
                serde_json::json!({
                    "version": version,
                    "md5sum": md5sum,
                    "models": models,
                    "tarball": format!("firmware_{version}.tar.gz"),
                })
            })
            .collect();
        let manifest = serde_json::json!({
            "origin": { "url": origin.as_str() },
            "releases": releases,
        });
        let path = self.path("manifest.json");
        fs::write(&path, serde_json::to_vec_pretty(&manifest)?)?;
        Ok(path)
    }

    /// The binary pointed at this fixture's directories.
    fn firmsync(&self, manifest: &Path) -> Result<Command, Box<dyn std::error::Error>> {
        self.firmsync_with(manifest, &self.path("config.json"))
    }

    fn firmsync_with(&self, manifest: &Path, config: &Path) -> Result<Command, Box<dyn std::error::Error>> {
        let mut cmd = Command::cargo_bin("firmsync")?;
        for var in CONFIG_VARS {
            cmd.env_remove(var);
        }
        cmd.arg("--config")
            .arg(config)
            .arg("--url")
            .arg(manifest)
            .arg("--dir")
            .arg(self.path("firmware"))
            .arg("--cache-dir")
            .arg(self.path("cache"));
        Ok(cmd)
    }
}

#[test]
fn test_help_lists_filter_flags() -> TestResult {
    Command::cargo_bin("firmsync")?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--incfiles"))
        .stdout(predicate::str::contains("--flatten"))
        .stdout(predicate::str::contains("--latest"));
    Ok(())
}

#[test]
fn test_installs_then_reports_up_to_date() -> TestResult {
    let fixture = Fixture::new()?;
    let md5sum = fixture.publish(
        "firmware_1_4_1.tar.gz",
        &[
            ("firmware_1_4_1/D40_firmware_1_4_1.eff", &b"d40 image"[..]),
            ("firmware_1_4_1/D50_firmware_1_4_1.eff", &b"d50 image"[..]),
            ("firmware_1_4_1/README", &b"notes"[..]),
        ],
    )?;
    let manifest = fixture.manifest(&[("1_4_1", md5sum.as_str(), &["D40", "D50"][..])])?;

    fixture
        .firmsync(&manifest)?
        .assert()
        .success()
        .stdout(predicate::str::contains("Synchronized:"))
        .stdout(predicate::str::contains("1 installed"))
        .stderr(predicate::str::contains("[D40,D50]: Missing"));

    let installed = fixture.path("firmware").join("firmware_1_4_1");
    assert_eq!(fs::read(installed.join("D40_firmware_1_4_1.eff"))?, b"d40 image");
    assert_eq!(fs::read(installed.join("D50_firmware_1_4_1.eff"))?, b"d50 image");
    assert!(!installed.join("README").exists());
    assert_eq!(
        fs::read_to_string(fixture.path("cache").join("1_4_1").join("D40.md5"))?,
        md5sum
    );

    fixture
        .firmsync(&manifest)?
        .assert()
        .success()
        .stdout(predicate::str::contains("1 up to date"))
        .stderr(predicate::str::contains("[D40,D50]: Up to date"));
    Ok(())
}

#[test]
fn test_flatten_and_exclude_from_flags() -> TestResult {
    let fixture = Fixture::new()?;
    let md5sum = fixture.publish(
        "firmware_2_0.tar.gz",
        &[
            ("firmware_2_0/D40_firmware_2_0.eff", &b"d40"[..]),
            ("firmware_2_0/D70_firmware_2_0.eff", &b"d70"[..]),
        ],
    )?;
    let manifest = fixture.manifest(&[("2_0", md5sum.as_str(), &["D40", "D70"][..])])?;

    fixture
        .firmsync(&manifest)?
        .args(["--flatten", "--exc", "D70"])
        .assert()
        .success();

    let firmware = fixture.path("firmware");
    assert!(firmware.join("D40_firmware_2_0.eff").exists());
    assert!(firmware.join("D70_firmware_2_0.eff").exists());
    assert!(fixture.path("cache").join("2_0").join("D40.md5").exists());
    assert!(!fixture.path("cache").join("2_0").join("D70.md5").exists());
    Ok(())
}

#[test]
fn test_checksum_mismatch_is_not_fatal() -> TestResult {
    let fixture = Fixture::new()?;
    fixture.publish("firmware_1_0.tar.gz", &[("firmware_1_0/D40.eff", &b"d40"[..])])?;
    let good = fixture.publish("firmware_0_9.tar.gz", &[("firmware_0_9/D40.eff", &b"old"[..])])?;
    let manifest = fixture.manifest(&[
        ("1_0", "00000000000000000000000000000000", &["D40"][..]),
        ("0_9", good.as_str(), &["D40"][..]),
    ])?;

    fixture
        .firmsync(&manifest)?
        .assert()
        .success()
        .stdout(predicate::str::contains("Finished with failures:"))
        .stdout(predicate::str::contains("1 installed"))
        .stdout(predicate::str::contains("1 abandoned"))
        .stderr(predicate::str::contains("doesn't match manifest"));

    assert!(!fixture.path("firmware").join("firmware_1_0").join("D40.eff").exists());
    assert!(!fixture.path("cache").join("1_0").exists());
    assert!(fixture.path("firmware").join("firmware_0_9").join("D40.eff").exists());
    Ok(())
}

#[test]
fn test_missing_manifest_exits_with_status_2() -> TestResult {
    let fixture = Fixture::new()?;
    fixture
        .firmsync(&fixture.path("absent.json"))?
        .args(["--attempts", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unable to retrieve the firmware manifest"));
    Ok(())
}

#[test]
fn test_missing_config_file_exits_with_status_1() -> TestResult {
    let fixture = Fixture::new()?;
    let manifest = fixture.manifest(&[])?;
    fixture
        .firmsync_with(&manifest, &fixture.path("absent.json"))?
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unable to read configuration file"));
    Ok(())
}

#[test]
fn test_invalid_arguments_exit_with_status_1() -> TestResult {
    Command::cargo_bin("firmsync")?
        .args(["--attempts", "0"])
        .assert()
        .code(1);
    Ok(())
}

#[test]
fn test_environment_overrides_config_file() -> TestResult {
    let fixture = Fixture::new()?;
    let md5sum = fixture.publish("firmware_3_1.tar.gz", &[("firmware_3_1/D60.eff", &b"d60"[..])])?;
    let manifest = fixture.manifest(&[("3_1", md5sum.as_str(), &["D60"][..])])?;
    fs::write(
        fixture.path("config.json"),
        r#"{ "include": { "models": "D40", "files": "*.eff" } }"#,
    )?;

    fixture
        .firmsync(&manifest)?
        .assert()
        .success()
        .stdout(predicate::str::contains("1 not wanted"));

    fixture
        .firmsync(&manifest)?
        .env("INCLUDE_MODELS", "D6*")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 installed"));
    Ok(())
}
