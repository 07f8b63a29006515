//! Packaged artifacts: the artifact stored inside a zip archive (a jar or
//! similar distribution file) at [`ARTIFACT_RESOURCE_PATH`].

use std::io::{Cursor, Read, Write};

use zip::result::ZipError;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::ZipArchive;

use super::{VersionStamp, ARTIFACT_RESOURCE_PATH, VERSION_RESOURCE_PATH};
use crate::error::{Error, Result};

/// Pull the artifact out of an archive.
///
/// Returns `Ok(None)` for archives that carry no schema artifact (plain
/// dependencies without YANG content).
pub fn read_artifact(archive: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| Error::corrupt(format!("unreadable archive: {e}")))?;

    let mut entry = match archive.by_name(ARTIFACT_RESOURCE_PATH) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(Error::corrupt(format!("unreadable archive entry: {e}"))),
    };
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(format!("reading {ARTIFACT_RESOURCE_PATH}"), e))?;
    Ok(Some(bytes))
}

/// Build an archive holding the artifact and its plain-text stamp.
pub fn package(artifact: &[u8], stamp: &VersionStamp) -> Result<Vec<u8>> {
    let zip_error = |e: ZipError| Error::io("writing archive", std::io::Error::other(e));
    let options = SimpleFileOptions::default();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    writer
        .start_file(ARTIFACT_RESOURCE_PATH, options)
        .map_err(zip_error)?;
    writer
        .write_all(artifact)
        .map_err(|e| Error::io("writing archive", e))?;
    writer
        .start_file(VERSION_RESOURCE_PATH, options)
        .map_err(zip_error)?;
    writer
        .write_all(stamp.to_string().as_bytes())
        .map_err(|e| Error::io("writing archive", e))?;

    Ok(writer.finish().map_err(zip_error)?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_then_read() {
        let stamp = VersionStamp::current();
        let archive = package(b"{\"format\":\"x\"}", &stamp).unwrap();
        let artifact = read_artifact(&archive).unwrap();
        assert_eq!(artifact.as_deref(), Some(&b"{\"format\":\"x\"}"[..]));
    }

    #[test]
    fn test_archive_without_artifact() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"Manifest-Version: 1.0\n").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert_eq!(read_artifact(&bytes).unwrap(), None);
    }

    #[test]
    fn test_not_an_archive() {
        assert!(matches!(
            read_artifact(b"plain bytes"),
            Err(Error::CorruptArtifact { .. })
        ));
    }
}
