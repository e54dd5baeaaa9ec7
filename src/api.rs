use crate::error::{ConfigError, Result};
use crate::include::FsIncludeResolver;
use crate::parser::Parser;
use crate::serialization::{to_data, Data};
use crate::setting::{Setting, SettingMut};
use crate::value::FromSetting;
use crate::writer::{WriteOptions, Writer};
use log::debug;
use serde::{Serialize, Serializer};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A configuration document: one root group plus the options used to read
/// and write it.
///
/// Every read replaces the whole tree, and only once the new text has parsed
/// completely. A failed read leaves the previous tree in place.
#[derive(Debug, Clone)]
pub struct Config {
    root: Setting,
    include_dir: Option<PathBuf>,
    write_options: WriteOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.root.serialize(serializer)
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Setting::root(),
            include_dir: None,
            write_options: WriteOptions::default(),
        }
    }

    // === Reading ===

    pub fn read_str(&mut self, source: &str) -> Result<()> {
        self.read_str_named(source, "<input>")
    }

    /// Parses `source`, naming it `name` in diagnostics.
    pub fn read_str_named(&mut self, source: &str, name: &str) -> Result<()> {
        self.read_with_includes(source, name, self.include_dir.clone())
    }

    fn read_with_includes(
        &mut self,
        source: &str,
        name: &str,
        include_dir: Option<PathBuf>,
    ) -> Result<()> {
        let resolver = FsIncludeResolver::new(include_dir);
        let mut parser = Parser::with_includes(source, name.to_string(), &resolver)?;
        self.root = parser.parse_document()?;
        Ok(())
    }

    pub fn read<R: io::Read>(&mut self, mut reader: R) -> Result<()> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        self.read_str(&source)
    }

    /// Reads and parses the file at `path`. Without an include directory,
    /// `@include` paths are resolved against the file's own directory.
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!("reading configuration from {}", path.display());
        let source = fs::read_to_string(path)?;
        let include_dir = self.include_dir.clone().or_else(|| parent_dir(path));
        self.read_with_includes(&source, &path.to_string_lossy(), include_dir)
    }

    // === Writing ===

    pub fn write<W: io::Write>(&self, mut out: W) -> Result<()> {
        Writer::new(self.write_options).write(&self.root, &mut out)
    }

    pub fn write_string(&self) -> Result<String> {
        Writer::new(self.write_options).to_string(&self.root)
    }

    /// Writes the document to `path`. The file is only created once the whole
    /// tree has been rendered.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.write_string()?;
        fs::write(path, text)?;
        debug!("wrote configuration to {}", path.display());
        Ok(())
    }

    // === Tree access ===

    #[must_use]
    pub fn root(&self) -> &Setting {
        &self.root
    }

    /// Edit access to the root group. The root itself always stays a group.
    pub fn root_mut(&mut self) -> SettingMut<'_> {
        SettingMut::new(&mut self.root)
    }

    pub fn lookup(&self, path: &str) -> Result<&Setting> {
        self.root.lookup(path)
    }

    pub fn lookup_mut(&mut self, path: &str) -> Result<SettingMut<'_>> {
        self.root.lookup_mut(path).map(SettingMut::new)
    }

    #[must_use]
    pub fn try_lookup(&self, path: &str) -> Option<&Setting> {
        self.root.lookup(path).ok()
    }

    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.try_lookup(path).is_some()
    }

    /// See [`Setting::lookup_value`].
    pub fn lookup_value<T: FromSetting>(&self, path: &str, out: &mut T) -> bool {
        self.root.lookup_value(path, out)
    }

    /// Drops every setting.
    pub fn clear(&mut self) {
        self.root = Setting::root();
    }

    // === Options ===

    /// Directory that relative `@include` paths are resolved against.
    pub fn set_include_dir(&mut self, dir: impl Into<PathBuf>) {
        self.include_dir = Some(dir.into());
    }

    #[must_use]
    pub fn include_dir(&self) -> Option<&Path> {
        self.include_dir.as_deref()
    }

    pub fn set_write_options(&mut self, options: WriteOptions) {
        self.write_options = options;
    }

    #[must_use]
    pub fn write_options(&self) -> WriteOptions {
        self.write_options
    }

    // === Export ===

    #[must_use]
    pub fn to_value(&self) -> Data {
        to_data(&self.root)
    }

    /// Serializes the document into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails, for example on
    /// a non-finite float.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the document into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

/// Parses `source` into a new [`Config`].
///
/// This is the one-call entry point. `file_name` is used for error reporting
/// and `@include` paths are resolved against its directory.
///
/// # Errors
///
/// Returns a `ConfigError` if lexing, parsing or an include fails.
pub fn parse(source: &str, file_name: &str) -> Result<Config, ConfigError> {
    let mut config = Config::new();
    if let Some(dir) = parent_dir(Path::new(file_name)) {
        config.set_include_dir(dir);
    }
    config.read_str_named(source, file_name)?;
    Ok(config)
}

fn parent_dir(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::SettingType;

    #[test]
    fn test_simple_parse_to_json() {
        let source = r#"
            name = "My App";
            version = 1.0;
            is_enabled = true;
            features = [ "a", "b", "c" ];
            config = {
                host = "localhost";
                port = 8080;
            };
        "#;

        let expected_json = serde_json::json!({
            "name": "My App",
            "version": 1.0,
            "is_enabled": true,
            "features": ["a", "b", "c"],
            "config": {
                "host": "localhost",
                "port": 8080,
            }
        });

        let config = parse(source, "test.cfg").unwrap();
        let result = config.to_json().unwrap();
        let result_json: serde_json::Value = serde_json::from_str(&result).unwrap();

        assert_eq!(result_json, expected_json);
    }

    #[test]
    fn test_simple_parse_to_yaml() {
        let source = r#"
            name = "My App";
            version = 1.0;
            is_enabled = true;
        "#;

        let expected_yaml = "name: My App\nversion: 1.0\nis_enabled: true\n";

        let config = parse(source, "test.cfg").unwrap();
        assert_eq!(config.to_yaml().unwrap(), expected_yaml);
    }

    #[test]
    fn test_failed_read_keeps_previous_tree() {
        let mut config = Config::new();
        config.read_str("a = 1;").unwrap();
        let before = config.clone();
        assert!(config.read_str("a = 1; b = ").is_err());
        assert_eq!(config, before);
        assert!(config.read_str("a = 1; a = 2;").is_err());
        assert_eq!(config.lookup("a").unwrap().as_int().unwrap(), 1);
    }

    #[test]
    fn test_read_replaces_tree() {
        let mut config = Config::new();
        config.read_str("a = 1;").unwrap();
        config.read(&b"b = 2;"[..]).unwrap();
        assert!(!config.exists("a"));
        assert!(config.exists("b"));
        config.clear();
        assert!(config.root().is_empty());
    }

    #[test]
    fn test_build_then_write() {
        let mut config = Config::new();
        let mut root = config.root_mut();
        let mut server = root.add("server", SettingType::Group).unwrap();
        server.add_value("port", 8080).unwrap();
        config.set_write_options(WriteOptions {
            indent: 4,
            ..WriteOptions::default()
        });
        assert_eq!(config.write_string().unwrap(), "server = {\n    port = 8080;\n};\n");
        assert_eq!(config.write_options().indent, 4);

        let mut out = Vec::new();
        config.write(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), config.write_string().unwrap());
    }

    #[test]
    fn test_lookup_helpers() {
        let config = parse("a = { b = [1, 2, 3]; };", "test.cfg").unwrap();
        assert!(config.exists("a.b[2]"));
        assert!(!config.exists("a.b[3]"));
        assert!(config.try_lookup("a.c").is_none());
        let mut second = 0_i32;
        assert!(config.lookup_value("a.b[1]", &mut second));
        assert_eq!(second, 2);
    }

    #[test]
    fn test_parse_takes_include_dir_from_file_name() {
        let config = parse("", "conf/app.cfg").unwrap();
        assert_eq!(config.include_dir(), Some(Path::new("conf")));
        let config = parse("", "app.cfg").unwrap();
        assert_eq!(config.include_dir(), None);
    }

    #[test]
    fn test_read_file_resolves_includes_next_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("extra.cfg"), "extra = 2;\n").unwrap();
        let main = dir.path().join("main.cfg");
        fs::write(&main, "main = 1;\n@include \"extra.cfg\"\n").unwrap();

        let mut config = Config::new();
        config.read_file(&main).unwrap();
        assert_eq!(config.lookup("extra").unwrap().as_int().unwrap(), 2);
        // the reader's own setting is left alone
        assert_eq!(config.include_dir(), None);
    }

    #[test]
    fn test_read_file_prefers_configured_include_dir() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("shared");
        fs::create_dir(&shared).unwrap();
        fs::write(shared.join("extra.cfg"), "from_shared = true;\n").unwrap();
        fs::write(dir.path().join("extra.cfg"), "from_local = true;\n").unwrap();
        let main = dir.path().join("main.cfg");
        fs::write(&main, "@include \"extra.cfg\"\n").unwrap();

        let mut config = Config::new();
        config.set_include_dir(&shared);
        config.read_file(&main).unwrap();
        assert!(config.exists("from_shared"));
        assert!(!config.exists("from_local"));
    }

    #[test]
    fn test_root_stays_a_group_through_edits() {
        let mut config = parse("a = [1, 2];", "test.cfg").unwrap();
        let mut root = config.root_mut();
        assert!(root.set(1).is_err());
        assert!(root.push_value(3).is_err());
        root.remove("a").unwrap();
        root.add_value("b", 1).unwrap();
        assert!(config.root().is_group());
        assert_eq!(config.write_string().unwrap(), "b = 1;\n");
    }
}
