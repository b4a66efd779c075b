use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::error::ExtractError;

/// Where the export document comes from, resolved once up front so the
/// streaming reader only ever sees a plain byte stream.
pub enum Source {
    Path(PathBuf),
}

impl Source {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }

    /// Opens the source and returns a reader over the JSON document,
    /// along with a human-readable basename used for the raw dump
    /// side-file and error messages.
    ///
    /// `.json` files are read directly. `.tar` archives are scanned for
    /// the first entry whose name ends `messages.json` (spec §4.2's
    /// "first match wins"); its bytes are buffered since `tar::Entry`
    /// borrows its archive and can't outlive this function.
    pub fn open(&self) -> Result<(Box<dyn Read>, String), ExtractError> {
        match self {
            Source::Path(path) => open_path(path),
        }
    }
}

fn open_path(path: &Path) -> Result<(Box<dyn Read>, String), ExtractError> {
    if !path.exists() {
        return Err(ExtractError::SourceNotFound(path.display().to_string()));
    }
    if !path.is_file() {
        return Err(ExtractError::SourceNotFound(format!(
            "{} is not a regular file",
            path.display()
        )));
    }

    let basename = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let file = File::open(path)?;
            Ok((Box::new(BufReader::new(file)), basename))
        }
        Some("tar") => {
            let file = File::open(path)?;
            let mut archive = tar::Archive::new(file);
            let mut entries = archive.entries()?;
            let mut found = None;
            while let Some(entry) = entries.next() {
                let mut entry = entry?;
                let name = entry.path()?.to_string_lossy().into_owned();
                if name.ends_with("messages.json") {
                    let mut buf = Vec::new();
                    entry.read_to_end(&mut buf)?;
                    found = Some(buf);
                    break;
                }
            }
            match found {
                Some(buf) => Ok((Box::new(Cursor::new(buf)), basename)),
                None => Err(ExtractError::MissingMetadata(
                    "tar archive has no entry ending messages.json".to_string(),
                )),
            }
        }
        _ => Err(ExtractError::UnsupportedFormat(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_source() {
        let source = Source::from_path("/nonexistent/export.json");
        assert!(matches!(source.open(), Err(ExtractError::SourceNotFound(_))));
    }

    #[test]
    fn rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.txt");
        std::fs::write(&path, b"{}").unwrap();
        let source = Source::from_path(path);
        assert!(matches!(source.open(), Err(ExtractError::UnsupportedFormat(_))));
    }

    #[test]
    fn opens_a_json_file_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, br#"{"userId":"u1"}"#).unwrap();
        let source = Source::from_path(path);
        let (mut reader, basename) = source.open().unwrap();
        let mut buf = String::new();
        reader.read_to_string(&mut buf).unwrap();
        assert_eq!(basename, "export");
        assert!(buf.contains("u1"));
    }

    #[test]
    fn scans_a_tar_archive_for_messages_json() {
        let dir = tempfile::tempdir().unwrap();
        let tar_path = dir.path().join("export.tar");
        let tar_file = File::create(&tar_path).unwrap();
        let mut builder = tar::Builder::new(tar_file);
        let payload = br#"{"userId":"u1","exportDate":"2021-01-01T00:00:00Z","conversations":[]}"#;
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_cksum();
        builder.append_data(&mut header, "export/messages.json", &payload[..]).unwrap();
        builder.finish().unwrap();
        drop(builder);

        let source = Source::from_path(tar_path);
        let (mut reader, _) = source.open().unwrap();
        let mut buf = String::new();
        reader.read_to_string(&mut buf).unwrap();
        assert!(buf.contains("u1"));
    }
}
