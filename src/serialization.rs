use crate::setting::Setting;
use crate::value::Value;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A plain-data projection of a settings tree, for export through serde.
///
/// Groups become maps that keep document order, arrays and lists become
/// sequences. Names, formats and source lines are not part of the data.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Data>),
    Map(Vec<(String, Data)>),
}

impl Data {
    /// Looks up a map entry by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Data> {
        match self {
            Data::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

#[must_use]
pub fn to_data(setting: &Setting) -> Data {
    if let Some(value) = setting.value() {
        return match value {
            Value::Boolean(b) => Data::Boolean(*b),
            Value::Int(i) => Data::Int(*i),
            Value::Float(f) => Data::Float(*f),
            Value::String(s) => Data::String(s.clone()),
        };
    }
    if setting.is_group() {
        Data::Map(
            setting
                .children()
                .map(|child| (child.name().unwrap_or_default().to_string(), to_data(child)))
                .collect(),
        )
    } else {
        Data::Sequence(setting.children().map(to_data).collect())
    }
}

impl Serialize for Data {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Data::Boolean(b) => serializer.serialize_bool(*b),
            Data::Int(i) => serializer.serialize_i64(*i),
            Data::Float(f) => serializer.serialize_f64(*f),
            Data::String(s) => serializer.serialize_str(s),
            Data::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Data::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for Setting {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        to_data(self).serialize(serializer)
    }
}
