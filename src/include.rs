use std::io;
use std::path::{Path, PathBuf};

/// The text of an included file and the name errors should refer to it by.
#[derive(Debug, Clone)]
pub struct IncludedSource {
    pub name: String,
    pub text: String,
}

/// Supplies the contents of files named by `@include` directives.
pub trait IncludeResolver {
    fn load(&self, path: &str) -> io::Result<IncludedSource>;
}

/// Reads included files from disk. Relative paths are taken relative to the
/// include directory when one is set, and to the working directory otherwise.
#[derive(Debug, Clone, Default)]
pub struct FsIncludeResolver {
    include_dir: Option<PathBuf>,
}

impl FsIncludeResolver {
    pub fn new(include_dir: Option<PathBuf>) -> Self {
        Self { include_dir }
    }

    fn locate(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.include_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl IncludeResolver for FsIncludeResolver {
    fn load(&self, path: &str) -> io::Result<IncludedSource> {
        let full = self.locate(path);
        let text = std::fs::read_to_string(&full)?;
        Ok(IncludedSource {
            name: full.to_string_lossy().to_string(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_reads_relative_to_include_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("extra.cfg"), "x = 1;").unwrap();
        let resolver = FsIncludeResolver::new(Some(dir.path().to_path_buf()));
        let source = resolver.load("extra.cfg").unwrap();
        assert_eq!(source.text, "x = 1;");
        assert!(source.name.ends_with("extra.cfg"));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FsIncludeResolver::new(Some(dir.path().to_path_buf()));
        let err = resolver.load("absent.cfg").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
