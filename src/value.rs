use crate::error::{ConfigError, Result};
use crate::setting::{Setting, SettingType};

/// The value held by a scalar setting.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    #[must_use]
    pub fn setting_type(&self) -> SettingType {
        match self {
            Value::Boolean(_) => SettingType::Boolean,
            Value::Int(_) => SettingType::Int,
            Value::Float(_) => SettingType::Float,
            Value::String(_) => SettingType::String,
        }
    }

    /// The zero value a freshly added scalar of `kind` starts with.
    pub(crate) fn default_for(kind: SettingType) -> Option<Value> {
        match kind {
            SettingType::Boolean => Some(Value::Boolean(false)),
            SettingType::Int => Some(Value::Int(0)),
            SettingType::Float => Some(Value::Float(0.0)),
            SettingType::String => Some(Value::String(String::new())),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Rust types a scalar setting can be read as. Reading never converts
/// between integers and floats.
pub trait FromSetting: Sized {
    fn from_setting(setting: &Setting) -> Result<Self>;
}

impl FromSetting for bool {
    fn from_setting(setting: &Setting) -> Result<Self> {
        setting.as_bool()
    }
}

impl FromSetting for i64 {
    fn from_setting(setting: &Setting) -> Result<Self> {
        setting.as_int()
    }
}

impl FromSetting for i32 {
    fn from_setting(setting: &Setting) -> Result<Self> {
        setting.as_int32()
    }
}

impl FromSetting for f64 {
    fn from_setting(setting: &Setting) -> Result<Self> {
        setting.as_float()
    }
}

impl FromSetting for String {
    fn from_setting(setting: &Setting) -> Result<Self> {
        setting.as_str().map(str::to_string)
    }
}

impl FromSetting for Value {
    fn from_setting(setting: &Setting) -> Result<Self> {
        setting.value().cloned().ok_or_else(|| {
            ConfigError::type_mismatch(setting.label(), "scalar", setting.setting_type().to_string())
        })
    }
}
