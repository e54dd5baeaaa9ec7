use crate::error::{ConfigError, Result};
use crate::resolver::SettingPath;
use crate::setting::{Format, Setting, SettingType};
use crate::utils::quote_string;
use crate::value::Value;
use std::io;

/// Presentation choices for written documents. None of them change what is
/// read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Spaces per nesting level.
    pub indent: usize,
    /// End every setting with `;`.
    pub semicolons: bool,
    /// Write `name: { ... }` instead of `name = { ... }` for groups.
    pub colon_for_groups: bool,
    /// Write `name: value` instead of `name = value` for everything but groups.
    pub colon_for_scalars: bool,
    /// Put the `{` of a named group on its own line.
    pub brace_on_new_line: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            semicolons: true,
            colon_for_groups: false,
            colon_for_scalars: false,
            brace_on_new_line: false,
        }
    }
}

/// Writes a settings tree back to text.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    options: WriteOptions,
}

impl Writer {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Renders the children of `root` as a document. Nothing is written to
    /// `out` unless the whole tree renders.
    pub fn write<W: io::Write>(&self, root: &Setting, out: &mut W) -> Result<()> {
        let text = self.to_string(root)?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn to_string(&self, root: &Setting) -> Result<String> {
        let mut buf = String::new();
        let path = SettingPath::root();
        for child in root.children() {
            self.write_setting(&mut buf, child, 0, &path)?;
        }
        Ok(buf)
    }

    fn write_setting(
        &self,
        buf: &mut String,
        setting: &Setting,
        depth: usize,
        parent: &SettingPath,
    ) -> Result<()> {
        let name = setting.name().unwrap_or_default();
        let path = parent.join_name(name);
        self.pad(buf, depth);
        buf.push_str(name);

        let colon = if setting.is_group() {
            self.options.colon_for_groups
        } else {
            self.options.colon_for_scalars
        };
        buf.push_str(if colon { ":" } else { " =" });

        if setting.is_group() && self.options.brace_on_new_line && !setting.is_empty() {
            buf.push('\n');
            self.pad(buf, depth);
        } else {
            buf.push(' ');
        }

        self.write_value(buf, setting, depth, &path)?;
        if self.options.semicolons {
            buf.push(';');
        }
        buf.push('\n');
        Ok(())
    }

    /// Writes the value of `setting` starting at the current column; nested
    /// lines are indented one level past `depth`.
    fn write_value(
        &self,
        buf: &mut String,
        setting: &Setting,
        depth: usize,
        path: &SettingPath,
    ) -> Result<()> {
        match setting.setting_type() {
            SettingType::Group => {
                if setting.is_empty() {
                    buf.push_str("{ }");
                    return Ok(());
                }
                buf.push_str("{\n");
                for child in setting.children() {
                    self.write_setting(buf, child, depth + 1, path)?;
                }
                self.pad(buf, depth);
                buf.push('}');
            }
            SettingType::Array => {
                self.write_inline(buf, setting, path, '[', ']')?;
            }
            SettingType::List => {
                if setting.children().all(|c| !c.is_group() && !c.is_list()) {
                    self.write_inline(buf, setting, path, '(', ')')?;
                    return Ok(());
                }
                buf.push_str("(\n");
                let count = setting.len();
                for (i, element) in setting.children().enumerate() {
                    self.pad(buf, depth + 1);
                    self.write_value(buf, element, depth + 1, &path.join_index(i))?;
                    if i + 1 < count {
                        buf.push(',');
                    }
                    buf.push('\n');
                }
                self.pad(buf, depth);
                buf.push(')');
            }
            _ => self.write_scalar(buf, setting, path)?,
        }
        Ok(())
    }

    /// Writes an array, or a list without groups or lists, on one line.
    fn write_inline(
        &self,
        buf: &mut String,
        setting: &Setting,
        path: &SettingPath,
        open: char,
        close: char,
    ) -> Result<()> {
        if setting.is_empty() {
            buf.push(open);
            buf.push(' ');
            buf.push(close);
            return Ok(());
        }
        buf.push(open);
        buf.push(' ');
        for (i, element) in setting.children().enumerate() {
            if i > 0 {
                buf.push_str(", ");
            }
            let element_path = path.join_index(i);
            if element.is_array() {
                self.write_inline(buf, element, &element_path, '[', ']')?;
            } else {
                self.write_scalar(buf, element, &element_path)?;
            }
        }
        buf.push(' ');
        buf.push(close);
        Ok(())
    }

    fn write_scalar(&self, buf: &mut String, setting: &Setting, path: &SettingPath) -> Result<()> {
        match setting.value() {
            Some(Value::Boolean(b)) => buf.push_str(if *b { "true" } else { "false" }),
            Some(Value::Int(i)) => write_int(buf, *i, setting.format()),
            Some(Value::Float(f)) => {
                if !f.is_finite() {
                    return Err(ConfigError::Unrepresentable {
                        path: path.to_string(),
                        reason: format!("{f} has no literal form"),
                    });
                }
                // `{:?}` is the shortest round-trip spelling and keeps a `.0` on whole numbers.
                buf.push_str(&format!("{f:?}"));
            }
            Some(Value::String(s)) => buf.push_str(&quote_string(s)),
            None => {
                return Err(ConfigError::type_mismatch(
                    path.to_string(),
                    "scalar",
                    setting.setting_type().to_string(),
                ))
            }
        }
        Ok(())
    }

    fn pad(&self, buf: &mut String, depth: usize) {
        buf.extend(std::iter::repeat(' ').take(depth * self.options.indent));
    }
}

fn write_int(buf: &mut String, value: i64, format: Format) {
    match format {
        Format::Hexadecimal => {
            let bits = value as u64;
            buf.push_str(&format!("0x{bits:X}"));
            if bits > u64::from(u32::MAX) {
                buf.push('L');
            }
        }
        Format::Default => {
            buf.push_str(&value.to_string());
            if i32::try_from(value).is_err() {
                buf.push('L');
            }
        }
    }
}
