use crate::constants::MAX_INPUT_FILE_BYTES;
use crate::error::{ImporterError, Result};
use std::fs;
use std::path::Path;

/// Reads a hash input file, enforcing the same extension and size limits the
/// uploader applies before parsing: `.txt`/`.csv` only, at most 5 MiB.
pub fn read_input_file(path: &str) -> Result<String> {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if extension != "txt" && extension != "csv" {
        return Err(ImporterError::Input(format!(
            "Only .txt or .csv files are allowed. You provided: {path}"
        )));
    }

    let metadata = fs::metadata(path)?;
    if metadata.len() > MAX_INPUT_FILE_BYTES {
        return Err(ImporterError::Input(format!(
            "File size cannot exceed {} MB.",
            MAX_INPUT_FILE_BYTES / (1024 * 1024)
        )));
    }

    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_txt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashes.txt");
        fs::write(&path, "AAAAAAAAAAAAAAAAAAAA==\n").unwrap();
        let content = read_input_file(path.to_str().unwrap()).unwrap();
        assert!(content.contains("AAAA"));
    }

    #[test]
    fn rejects_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashes.xlsx");
        fs::write(&path, "data").unwrap();
        let err = read_input_file(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains(".txt or .csv"));
    }

    #[test]
    fn rejects_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let mut file = fs::File::create(&path).unwrap();
        let chunk = vec![b'A'; 1024 * 1024];
        for _ in 0..6 {
            file.write_all(&chunk).unwrap();
        }
        file.flush().unwrap();
        let err = read_input_file(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("cannot exceed"));
    }
}
