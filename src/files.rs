use crate::error::FileError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

fn io_error(path: &Path, source: std::io::Error) -> FileError {
    FileError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn collect_matches(directory: &Path, name: &str, found: &mut Vec<PathBuf>) -> Result<(), FileError> {
    let entries = fs::read_dir(directory).map_err(|e| io_error(directory, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error(directory, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_error(&path, e))?;
        if file_type.is_dir() {
            collect_matches(&path, name, found)?;
        } else if entry.file_name() == name {
            found.push(path);
        }
    }
    Ok(())
}

/// Searches `directory` recursively for a file named exactly `name` and
/// returns its path and contents. Exactly one non-empty match is required.
pub fn find_file(directory: &Path, name: &str) -> Result<(PathBuf, Vec<u8>), FileError> {
    let mut found = Vec::new();
    if directory.is_dir() {
        collect_matches(directory, name, &mut found)?;
    }

    let path = match found.len() {
        0 => {
            return Err(FileError::NotFound {
                name: name.to_string(),
                directory: directory.display().to_string(),
            })
        }
        1 => found.remove(0),
        count => {
            return Err(FileError::Ambiguous {
                name: name.to_string(),
                directory: directory.display().to_string(),
                count,
            })
        }
    };

    let contents = fs::read(&path).map_err(|e| io_error(&path, e))?;
    if contents.is_empty() {
        return Err(FileError::Empty {
            name: name.to_string(),
            directory: directory.display().to_string(),
        });
    }
    debug!(path = %path.display(), bytes = contents.len(), "Found source file");
    Ok((path, contents))
}

/// Writes `contents` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<(), FileError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| io_error(path, e))
}
