//! Records as files on disk.

use crate::codec::Codec;
use crate::error::WireResult;
use openfloor_types::Record;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write a record to `path`, replacing any existing file.
///
/// The document is written to a sibling temporary file first and renamed
/// into place, so readers never see a half-written record.
pub fn save_record<R: Record>(codec: &Codec, path: &Path, record: &R) -> WireResult<()> {
    let bytes = codec.encode(record)?;
    let tmp = temp_path(path);
    fs::write(&tmp, &bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    debug!(
        record = R::NAME,
        path = %path.display(),
        bytes = bytes.len(),
        "Saved record"
    );
    Ok(())
}

/// `envelope.json` -> `envelope.json.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Read a record from `path`.
///
/// Files larger than the codec's `max_document_bytes` are refused before
/// they are read.
pub fn load_record<R: Record>(codec: &Codec, path: &Path) -> WireResult<R> {
    let file = fs::File::open(path)?;
    codec.check_size(file.metadata()?.len())?;
    let record = codec.read(BufReader::new(file))?;
    debug!(record = R::NAME, path = %path.display(), "Loaded record");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::error::WireError;
    use openfloor_types::{Identification, Manifest};

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let manifest = Manifest::new(Identification::new("tag:bot", "https://x/bot"), vec![]);

        let codec = Codec::default();
        save_record(&codec, &path, &manifest).unwrap();
        assert!(!temp_path(&path).exists());
        let back: Manifest = load_record(&codec, &path).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn test_temp_path_keeps_full_name() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("a.json");
        let toml_path = dir.path().join("a.toml");
        assert_eq!(temp_path(&json_path), dir.path().join("a.json.tmp"));
        assert_ne!(temp_path(&json_path), temp_path(&toml_path));

        // A neighbour sharing the stem is left alone.
        let neighbour = dir.path().join("a.tmp");
        fs::write(&neighbour, "keep").unwrap();
        let manifest = Manifest::new(Identification::new("tag:bot", "https://x/bot"), vec![]);
        save_record(&Codec::default(), &json_path, &manifest).unwrap();
        assert_eq!(fs::read_to_string(&neighbour).unwrap(), "keep");
        assert!(!temp_path(&json_path).exists());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_record::<Manifest>(&Codec::default(), Path::new("/nonexistent/m.json"))
            .unwrap_err();
        assert!(matches!(err, WireError::Io(_)));
    }

    #[test]
    fn test_load_refuses_large_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.json");
        fs::write(&path, vec![b' '; 128]).unwrap();
        let codec = Codec::new(CodecConfig {
            max_document_bytes: 64,
            ..CodecConfig::default()
        })
        .unwrap();
        let err = load_record::<Manifest>(&codec, &path).unwrap_err();
        assert!(matches!(
            err,
            WireError::DocumentTooLarge { size: 128, max: 64 }
        ));
    }
}
