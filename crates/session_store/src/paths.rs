use std::path::{Path, PathBuf};

pub const IDENTITY_FILE_NAME: &str = "session.json";
const TEMP_SUFFIX: &str = ".tmp";

#[must_use]
pub fn identity_path(state_dir: &Path) -> PathBuf {
    state_dir.join(IDENTITY_FILE_NAME)
}

/// Sibling path used to stage a write before it is renamed into place.
#[must_use]
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{identity_path, staging_path};

    #[test]
    fn staging_path_sits_next_to_target() {
        let path = identity_path(Path::new("/var/lib/cafe"));
        assert_eq!(path, Path::new("/var/lib/cafe/session.json"));
        assert_eq!(staging_path(&path), Path::new("/var/lib/cafe/session.json.tmp"));
    }
}
