//! Archive entry access, behind a trait so the pipeline can run against fakes.

use std::io::{Cursor, Read};

use failure::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Reads a single entry out of an in-memory archive.
pub trait ArchiveReader: Send + Sync {
    /// Returns `None` if the archive has no entry at exactly `path`.
    fn read_entry(&self, archive: &[u8], path: &str) -> Result<Option<Vec<u8>>, Error>;
}

/// Production reader for zip/jar artifacts.
pub struct ZipArchiveReader;

impl ArchiveReader for ZipArchiveReader {
    fn read_entry(&self, archive: &[u8], path: &str) -> Result<Option<Vec<u8>>, Error> {
        let mut archive = ZipArchive::new(Cursor::new(archive))?;
        let mut entry = match archive.by_name(path) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut buffer = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buffer)?;
        Ok(Some(buffer))
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use zip::write::{FileOptions, ZipWriter};

    use super::*;

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for &(name, contents) in entries {
            writer.start_file(name, FileOptions::default()).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_entry_by_exact_path() {
        let archive = build_archive(&[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
            ("mappings/mappings.tiny", b"v1\tofficial\tintermediary\n"),
        ]);
        let entry = ZipArchiveReader
            .read_entry(&archive, "mappings/mappings.tiny")
            .unwrap();
        assert_eq!(entry.unwrap(), b"v1\tofficial\tintermediary\n");
    }

    #[test]
    fn missing_entry_is_none() {
        let archive = build_archive(&[("other.txt", b"x")]);
        let entry = ZipArchiveReader
            .read_entry(&archive, "mappings/mappings.tiny")
            .unwrap();
        assert!(entry.is_none());
    }

    #[test]
    fn garbage_bytes_are_an_error() {
        assert!(ZipArchiveReader
            .read_entry(b"definitely not a zip", "mappings/mappings.tiny")
            .is_err());
    }
}
