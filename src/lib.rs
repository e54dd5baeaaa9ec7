pub mod api;
pub mod error;
pub mod include;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod serialization;
pub mod setting;
pub mod utils;
pub mod value;
pub mod writer;

pub use api::{parse, Config};
pub use error::{ConfigError, LexError, ParseError, Result};
pub use include::{FsIncludeResolver, IncludeResolver, IncludedSource};
pub use resolver::{PathSegment, SettingPath};
pub use serialization::Data;
pub use setting::{Format, Setting, SettingMut, SettingType};
pub use value::{FromSetting, Value};
pub use writer::{WriteOptions, Writer};
