use crate::error::{ConfigError, Result};
use crate::setting::Setting;
use log::trace;
use std::fmt;
use std::str::FromStr;

/// One step of a [`SettingPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Descend into the group child with this name.
    Name(String),
    /// Descend into the child at this position.
    Index(usize),
}

/// A parsed path such as `server.ports[0]`.
///
/// Names are separated by `.`, positions are written as `[n]` directly after
/// a name or another position. The empty path denotes the starting setting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettingPath {
    segments: Vec<PathSegment>,
}

impl SettingPath {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses `path`. Malformed paths fail with [`ConfigError::NotFound`], the
    /// same way a path that names nothing does.
    pub fn parse(path: &str) -> Result<Self> {
        let malformed = || ConfigError::not_found(path);
        let mut segments = Vec::new();
        let bytes = path.as_bytes();
        let mut pos = 0;

        // `expect_name` is true at the start and after every `.`
        let mut expect_name = true;
        while pos < bytes.len() {
            match bytes[pos] {
                b'[' => {
                    let close = path[pos..].find(']').ok_or_else(malformed)? + pos;
                    let digits = &path[pos + 1..close];
                    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(malformed());
                    }
                    if expect_name && !segments.is_empty() {
                        // `a.[0]`
                        return Err(malformed());
                    }
                    let index = digits.parse::<usize>().map_err(|_| malformed())?;
                    segments.push(PathSegment::Index(index));
                    pos = close + 1;
                    expect_name = false;
                }
                b'.' => {
                    if expect_name {
                        // leading dot or `a..b`
                        return Err(malformed());
                    }
                    expect_name = true;
                    pos += 1;
                }
                _ => {
                    if !expect_name {
                        // `a[0]b`
                        return Err(malformed());
                    }
                    let start = pos;
                    while pos < bytes.len() && !matches!(bytes[pos], b'.' | b'[' | b']') {
                        pos += 1;
                    }
                    if pos < bytes.len() && bytes[pos] == b']' {
                        return Err(malformed());
                    }
                    segments.push(PathSegment::Name(path[start..pos].to_string()));
                    expect_name = false;
                }
            }
        }
        if expect_name && !segments.is_empty() {
            // trailing dot
            return Err(malformed());
        }
        Ok(SettingPath { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path of the containing setting, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<SettingPath> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(SettingPath { segments })
    }

    #[must_use]
    pub fn join_name(&self, name: &str) -> SettingPath {
        let mut next = self.clone();
        next.segments.push(PathSegment::Name(name.to_string()));
        next
    }

    #[must_use]
    pub fn join_index(&self, index: usize) -> SettingPath {
        let mut next = self.clone();
        next.segments.push(PathSegment::Index(index));
        next
    }

    /// Walks the path from `start`, or returns `None` at the first step that
    /// does not resolve.
    #[must_use]
    pub fn resolve<'a>(&self, start: &'a Setting) -> Option<&'a Setting> {
        self.segments
            .iter()
            .try_fold(start, |current, segment| step(current, segment))
    }

    pub(crate) fn resolve_mut<'a>(&self, start: &'a mut Setting) -> Option<&'a mut Setting> {
        let mut current = start;
        for segment in &self.segments {
            current = step_mut(current, segment)?;
        }
        Some(current)
    }
}

fn step<'a>(current: &'a Setting, segment: &PathSegment) -> Option<&'a Setting> {
    match segment {
        PathSegment::Name(name) => current.try_get(name),
        PathSegment::Index(index) => current.try_at(*index),
    }
}

fn step_mut<'a>(current: &'a mut Setting, segment: &PathSegment) -> Option<&'a mut Setting> {
    match segment {
        PathSegment::Name(name) => current.try_get_mut(name),
        PathSegment::Index(index) => current.at_mut(*index).ok(),
    }
}

impl fmt::Display for SettingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Name(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Name(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for SettingPath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        SettingPath::parse(s)
    }
}

/// Resolves `path` against `root`, strictly left to right.
pub fn resolve<'a>(root: &'a Setting, path: &str) -> Result<&'a Setting> {
    let parsed = SettingPath::parse(path)?;
    parsed.resolve(root).ok_or_else(|| {
        trace!("path `{path}` did not resolve");
        ConfigError::not_found(path)
    })
}

pub(crate) fn resolve_mut<'a>(root: &'a mut Setting, path: &str) -> Result<&'a mut Setting> {
    let parsed = SettingPath::parse(path)?;
    parsed.resolve_mut(root).ok_or_else(|| {
        trace!("path `{path}` did not resolve");
        ConfigError::not_found(path)
    })
}
