//! Local archive source tests

use firmsync_archive::prelude::*;
use firmsync_manifest::{FileSpec, ModelSet, Origin, Release, Version};
use flate2::Compression;
use flate2::write::GzEncoder;
use md5::{Digest, Md5};
use std::io::Read;
use std::ops::ControlFlow;
use std::path::Path;
use url::Url;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn write_tarball(path: &Path, entries: &[(&str, &[u8])]) -> Result<String, std::io::Error> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(1_500_000_000);
        header.set_cksum();
        builder.append_data(&mut header, name, *data)?;
    }
    let bytes = builder.into_inner()?.finish()?;
    std::fs::write(path, &bytes)?;
    Ok(hex::encode(Md5::digest(&bytes)))
}

fn release(tarball: &str, checksum: &str) -> Release {
    Release {
        version: Version::from("2_0_0"),
        checksum: checksum.to_string(),
        models: ModelSet::new(["D40", "D60"]),
        tarball: tarball.to_string(),
        files: vec![FileSpec {
            path: "firmware_2_0_0/D40_firmware_2_0_0.eff".to_string(),
            models: vec!["D40".to_string()],
        }],
    }
}

#[test]
fn test_file_source_streams_local_tarball() -> TestResult {
    let dir = tempfile::tempdir()?;
    let checksum = write_tarball(
        &dir.path().join("firmware_2_0_0.tar.gz"),
        &[
            ("firmware_2_0_0/D40_firmware_2_0_0.eff", b"d40 image"),
            ("firmware_2_0_0/README", b"notes"),
        ],
    )?;
    let origin = Origin::new(Url::from_directory_path(dir.path()).map_err(|()| "bad dir")?);

    let mut stream =
        FileArchiveSource::new().open(&release("firmware_2_0_0.tar.gz", &checksum), &origin)?;

    let mut headers = Vec::new();
    stream.for_each_entry(&mut |header, body| {
        let mut sink = Vec::new();
        if body.read_to_end(&mut sink).is_err() || sink.len() as u64 != header.size {
            return ControlFlow::Break(());
        }
        headers.push(header.clone());
        ControlFlow::Continue(())
    })?;

    assert_eq!(headers.len(), 2);
    let first = headers.first().ok_or("no entries")?;
    assert_eq!(first.models, ["D40"]);
    let second = headers.get(1).ok_or("missing entry")?;
    assert_eq!(second.name, "README");
    assert!(second.applies_to_all());
    assert_eq!(stream.checksum(), checksum);
    Ok(())
}

#[test]
fn test_visitor_break_stops_walk() -> TestResult {
    let dir = tempfile::tempdir()?;
    let checksum = write_tarball(
        &dir.path().join("fw.tar.gz"),
        &[("a.eff", b"a"), ("b.eff", b"b"), ("c.eff", b"c")],
    )?;
    let origin = Origin::new(Url::from_directory_path(dir.path()).map_err(|()| "bad dir")?);
    let mut stream = FileArchiveSource::new().open(&release("fw.tar.gz", &checksum), &origin)?;

    let mut visited = 0;
    stream.for_each_entry(&mut |_, _| {
        visited += 1;
        ControlFlow::Break(())
    })?;
    assert_eq!(visited, 1);
    Ok(())
}

#[test]
fn test_missing_archive_is_open_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let origin = Origin::new(Url::from_directory_path(dir.path()).map_err(|()| "bad dir")?);
    let err = FileArchiveSource::new()
        .open(&release("absent.tar.gz", "00"), &origin)
        .err()
        .ok_or("missing archive should not open")?;
    assert!(matches!(err, ArchiveError::Open { .. }));
    Ok(())
}

#[test]
fn test_remote_origin_is_unsupported() -> TestResult {
    let origin = Origin::new(Url::parse("https://downloads.example.com/firmware/")?);
    let err = FileArchiveSource::new()
        .open(&release("fw.tar.gz", "00"), &origin)
        .err()
        .ok_or("remote origin should be rejected")?;
    assert!(matches!(err, ArchiveError::Unsupported(url) if url.scheme() == "https"));
    Ok(())
}

#[test]
fn test_corrupt_archive_fails_the_walk() -> TestResult {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("junk.tar.gz"), b"definitely not gzip")?;
    let origin = Origin::new(Url::from_directory_path(dir.path()).map_err(|()| "bad dir")?);
    let mut stream = FileArchiveSource::new().open(&release("junk.tar.gz", "00"), &origin)?;

    assert!(
        stream
            .for_each_entry(&mut |_, _| ControlFlow::Continue(()))
            .is_err()
    );
    Ok(())
}
