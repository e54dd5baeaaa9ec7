use crate::error::{ConfigError, Result};
use crate::resolver;
use crate::utils::is_valid_name;
use crate::value::{FromSetting, Value};
use std::fmt;
use std::ops::Deref;

/// The type of a setting. A setting's type is fixed when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingType {
    /// No type. No setting ever has it; it exists so callers can name "nothing".
    None,
    Int,
    Float,
    String,
    Boolean,
    Group,
    Array,
    List,
}

impl SettingType {
    #[must_use]
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            SettingType::Int | SettingType::Float | SettingType::String | SettingType::Boolean
        )
    }

    #[must_use]
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            SettingType::Group | SettingType::Array | SettingType::List
        )
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettingType::None => "none",
            SettingType::Int => "int",
            SettingType::Float => "float",
            SettingType::String => "string",
            SettingType::Boolean => "boolean",
            SettingType::Group => "group",
            SettingType::Array => "array",
            SettingType::List => "list",
        };
        f.write_str(name)
    }
}

/// How an integer is spelled when written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Default,
    Hexadecimal,
}

#[derive(Debug, Clone)]
enum Node {
    Scalar(Value),
    Group(Vec<Setting>),
    Array(Vec<Setting>),
    List(Vec<Setting>),
}

impl Node {
    fn empty(kind: SettingType) -> Option<Node> {
        match kind {
            SettingType::None => None,
            SettingType::Group => Some(Node::Group(Vec::new())),
            SettingType::Array => Some(Node::Array(Vec::new())),
            SettingType::List => Some(Node::List(Vec::new())),
            scalar => Value::default_for(scalar).map(Node::Scalar),
        }
    }
}

/// A node of the settings tree: a group, array, list or scalar, optionally named.
///
/// Children are owned by their parent; removing or dropping a setting drops its
/// whole subtree. Equality compares type, name, value and children in order;
/// the integer format and source line are presentation details and ignored.
/// Trees are edited through [`SettingMut`].
#[derive(Debug, Clone)]
pub struct Setting {
    name: Option<String>,
    format: Format,
    source_line: Option<usize>,
    node: Node,
}

impl PartialEq for Setting {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name {
            return false;
        }
        match (&self.node, &other.node) {
            (Node::Scalar(a), Node::Scalar(b)) => a == b,
            (Node::Group(a), Node::Group(b))
            | (Node::Array(a), Node::Array(b))
            | (Node::List(a), Node::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Setting {
    pub(crate) fn root() -> Self {
        Self::from_node(Node::Group(Vec::new()))
    }

    pub(crate) fn group(children: Vec<Setting>) -> Self {
        Self::from_node(Node::Group(children))
    }

    pub(crate) fn array(children: Vec<Setting>) -> Self {
        Self::from_node(Node::Array(children))
    }

    pub(crate) fn list(children: Vec<Setting>) -> Self {
        Self::from_node(Node::List(children))
    }

    pub(crate) fn scalar(value: Value) -> Self {
        Self::from_node(Node::Scalar(value))
    }

    fn from_node(node: Node) -> Self {
        Setting {
            name: None,
            format: Format::Default,
            source_line: None,
            node,
        }
    }

    pub(crate) fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub(crate) fn with_line(mut self, line: usize) -> Self {
        self.source_line = Some(line);
        self
    }

    pub(crate) fn with_format(mut self, format: Format) -> Self {
        self.set_format(format);
        self
    }

    // === Accessors ===

    #[must_use]
    pub fn setting_type(&self) -> SettingType {
        match &self.node {
            Node::Scalar(v) => v.setting_type(),
            Node::Group(_) => SettingType::Group,
            Node::Array(_) => SettingType::Array,
            Node::List(_) => SettingType::List,
        }
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Sets how an integer is written. Ignored for every other type.
    pub(crate) fn set_format(&mut self, format: Format) {
        if let Node::Scalar(Value::Int(_)) = self.node {
            self.format = format;
        }
    }

    /// The setting's own name; `None` for array and list elements and the root.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The line this setting started on, if it was read from text.
    #[must_use]
    pub fn source_line(&self) -> Option<usize> {
        self.source_line
    }

    /// Number of children; `0` for scalars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children_slice().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self.node, Node::Group(_))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.node, Node::Array(_))
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self.node, Node::List(_))
    }

    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        !self.is_scalar()
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self.node, Node::Scalar(_))
    }

    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self.node, Node::Scalar(Value::Int(_) | Value::Float(_)))
    }

    /// The scalar value, or `None` for groups, arrays and lists.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match &self.node {
            Node::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Children in order; empty for scalars.
    pub fn children(&self) -> std::slice::Iter<'_, Setting> {
        self.children_slice().iter()
    }

    fn children_slice(&self) -> &[Setting] {
        match &self.node {
            Node::Group(c) | Node::Array(c) | Node::List(c) => c,
            Node::Scalar(_) => &[],
        }
    }

    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn mismatch(&self, expected: impl Into<String>) -> ConfigError {
        ConfigError::type_mismatch(self.label(), expected, self.setting_type().to_string())
    }

    fn child_path(&self, child: &str) -> String {
        match &self.name {
            Some(name) => format!("{name}.{child}"),
            None => child.to_string(),
        }
    }

    fn index_path(&self, index: usize) -> String {
        format!("{}[{index}]", self.label())
    }

    // === Scalar coercion ===

    pub fn as_bool(&self) -> Result<bool> {
        match &self.node {
            Node::Scalar(Value::Boolean(b)) => Ok(*b),
            _ => Err(self.mismatch("boolean")),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match &self.node {
            Node::Scalar(Value::Int(i)) => Ok(*i),
            _ => Err(self.mismatch("int")),
        }
    }

    /// Like [`Setting::as_int`], but also fails when the value does not fit in 32 bits.
    pub fn as_int32(&self) -> Result<i32> {
        let value = self.as_int()?;
        i32::try_from(value).map_err(|_| self.mismatch("32-bit int"))
    }

    pub fn as_float(&self) -> Result<f64> {
        match &self.node {
            Node::Scalar(Value::Float(f)) => Ok(*f),
            _ => Err(self.mismatch("float")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match &self.node {
            Node::Scalar(Value::String(s)) => Ok(s),
            _ => Err(self.mismatch("string")),
        }
    }

    /// Reads the scalar as any [`FromSetting`] type.
    pub fn value_as<T: FromSetting>(&self) -> Result<T> {
        T::from_setting(self)
    }

    /// Replaces the scalar value. The new value must have this setting's type;
    /// on failure the old value is kept.
    pub(crate) fn set(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let found = value.setting_type();
        match &mut self.node {
            Node::Scalar(current) if current.setting_type() == found => {
                *current = value;
                Ok(())
            }
            _ => Err(ConfigError::type_mismatch(
                self.label(),
                self.setting_type().to_string(),
                found.to_string(),
            )),
        }
    }

    // === Child access ===

    /// The child called `name`. Only groups have named children.
    pub fn get(&self, name: &str) -> Result<&Setting> {
        match &self.node {
            Node::Group(children) => children
                .iter()
                .find(|c| c.name() == Some(name))
                .ok_or_else(|| ConfigError::not_found(self.child_path(name))),
            _ => Err(self.mismatch("group")),
        }
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut Setting> {
        let path = self.child_path(name);
        if !self.is_group() {
            return Err(self.mismatch("group"));
        }
        self.children_vec_mut()
            .and_then(|children| children.iter_mut().find(|c| c.name() == Some(name)))
            .ok_or_else(|| ConfigError::not_found(path))
    }

    /// The child at `index`, for groups, arrays and lists alike.
    pub fn at(&self, index: usize) -> Result<&Setting> {
        if self.is_scalar() {
            return Err(self.mismatch("group, array or list"));
        }
        self.children_slice()
            .get(index)
            .ok_or_else(|| ConfigError::not_found(self.index_path(index)))
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> Result<&mut Setting> {
        if self.is_scalar() {
            return Err(self.mismatch("group, array or list"));
        }
        let path = self.index_path(index);
        self.children_vec_mut()
            .and_then(|children| children.get_mut(index))
            .ok_or_else(|| ConfigError::not_found(path))
    }

    /// Probe for a named child; `None` when absent or when this is not a group.
    #[must_use]
    pub fn try_get(&self, name: &str) -> Option<&Setting> {
        self.get(name).ok()
    }

    pub(crate) fn try_get_mut(&mut self, name: &str) -> Option<&mut Setting> {
        self.get_mut(name).ok()
    }

    #[must_use]
    pub fn try_at(&self, index: usize) -> Option<&Setting> {
        self.children_slice().get(index)
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.try_get(name).is_some()
    }

    /// Resolves a path such as `server.ports[0]` relative to this setting.
    pub fn lookup(&self, path: &str) -> Result<&Setting> {
        resolver::resolve(self, path)
    }

    pub(crate) fn lookup_mut(&mut self, path: &str) -> Result<&mut Setting> {
        resolver::resolve_mut(self, path)
    }

    /// Stores the value at `path` into `out` and returns `true`. Returns
    /// `false`, leaving `out` untouched, when the path does not resolve or
    /// holds a different type.
    pub fn lookup_value<T: FromSetting>(&self, path: &str, out: &mut T) -> bool {
        match self.lookup_as(path) {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn lookup_as<T: FromSetting>(&self, path: &str) -> Option<T> {
        let setting = resolver::resolve(self, path).ok()?;
        T::from_setting(setting).ok()
    }

    // === Mutation ===

    /// Adds an empty child called `name` of the given type to this group and
    /// returns it. Scalars start at zero, `""` or `false`.
    pub(crate) fn add(&mut self, name: &str, kind: SettingType) -> Result<&mut Setting> {
        if !self.is_group() {
            return Err(self.mismatch("group"));
        }
        if !is_valid_name(name) {
            return Err(ConfigError::InvalidName {
                name: name.to_string(),
            });
        }
        if self.exists(name) {
            return Err(ConfigError::AlreadyExists {
                path: self.child_path(name),
            });
        }
        let node = Node::empty(kind)
            .ok_or_else(|| ConfigError::type_mismatch(name, "a concrete type", kind.to_string()))?;
        let child = Setting::from_node(node).with_name(name.to_string());
        self.push_child(child)
    }

    /// Appends an unnamed element of the given type to this array or list.
    /// Arrays only take scalars, all of the type of their first element.
    pub(crate) fn push(&mut self, kind: SettingType) -> Result<&mut Setting> {
        match &self.node {
            Node::Array(children) => {
                if !kind.is_scalar() {
                    return Err(ConfigError::type_mismatch(
                        self.index_path(children.len()),
                        "scalar",
                        kind.to_string(),
                    ));
                }
                if let Some(first) = children.first() {
                    if first.setting_type() != kind {
                        return Err(ConfigError::type_mismatch(
                            self.index_path(children.len()),
                            first.setting_type().to_string(),
                            kind.to_string(),
                        ));
                    }
                }
            }
            Node::List(_) => {}
            _ => return Err(self.mismatch("array or list")),
        }
        let node = Node::empty(kind).ok_or_else(|| {
            ConfigError::type_mismatch(self.index_path(self.len()), "a concrete type", kind.to_string())
        })?;
        self.push_child(Setting::from_node(node))
    }

    /// [`Setting::add`] followed by [`Setting::set`].
    pub(crate) fn add_value(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Setting> {
        let value = value.into();
        let child = self.add(name, value.setting_type())?;
        child.node = Node::Scalar(value);
        Ok(child)
    }

    /// [`Setting::push`] followed by [`Setting::set`].
    pub(crate) fn push_value(&mut self, value: impl Into<Value>) -> Result<&mut Setting> {
        let value = value.into();
        let child = self.push(value.setting_type())?;
        child.node = Node::Scalar(value);
        Ok(child)
    }

    /// Removes the child called `name` and everything below it.
    pub(crate) fn remove(&mut self, name: &str) -> Result<()> {
        let path = self.child_path(name);
        match &mut self.node {
            Node::Group(children) => {
                let index = children
                    .iter()
                    .position(|c| c.name() == Some(name))
                    .ok_or_else(|| ConfigError::not_found(path))?;
                children.remove(index);
                Ok(())
            }
            _ => Err(self.mismatch("group")),
        }
    }

    /// Removes the child at `index` of a group, array or list.
    pub(crate) fn remove_at(&mut self, index: usize) -> Result<()> {
        if self.is_scalar() {
            return Err(self.mismatch("group, array or list"));
        }
        let path = self.index_path(index);
        match self.children_vec_mut() {
            Some(children) if index < children.len() => {
                children.remove(index);
                Ok(())
            }
            _ => Err(ConfigError::not_found(path)),
        }
    }

    pub(crate) fn children_vec_mut(&mut self) -> Option<&mut Vec<Setting>> {
        match &mut self.node {
            Node::Group(c) | Node::Array(c) | Node::List(c) => Some(c),
            Node::Scalar(_) => None,
        }
    }

    fn push_child(&mut self, child: Setting) -> Result<&mut Setting> {
        let children = match &mut self.node {
            Node::Group(c) | Node::Array(c) | Node::List(c) => c,
            Node::Scalar(v) => {
                return Err(ConfigError::type_mismatch(
                    child.label(),
                    "group, array or list",
                    v.setting_type().to_string(),
                ))
            }
        };
        children.push(child);
        let last = children.len() - 1;
        Ok(&mut children[last])
    }
}

/// Mutable access to one setting of a tree.
///
/// Every edit goes through this handle, so the tree stays well formed: group
/// names stay unique, arrays stay homogeneous and a setting keeps its type.
/// Reading goes through `Deref` to [`Setting`]. The handle never hands out
/// `&mut Setting`, so a node cannot be overwritten in place.
///
/// ```
/// let mut config = cfgtree_core::parse("server = { port = 8080; };", "app.cfg").unwrap();
/// let mut server = config.lookup_mut("server").unwrap();
/// server.get_mut("port").unwrap().set(9090).unwrap();
/// server.add_value("host", "localhost").unwrap();
/// assert_eq!(config.write_string().unwrap(), "server = {\n  port = 9090;\n  host = \"localhost\";\n};\n");
/// ```
///
/// Assigning through the handle does not compile:
///
/// ```compile_fail
/// let mut config = cfgtree_core::parse("port = 1; host = \"x\";", "app.cfg").unwrap();
/// let host = config.lookup("host").unwrap().clone();
/// *config.lookup_mut("port").unwrap() = host;
/// ```
///
/// ```compile_fail
/// let mut config = cfgtree_core::parse("a = [1, 2];", "app.cfg").unwrap();
/// let a = config.lookup("a").unwrap().clone();
/// *config.root_mut() = a;
/// ```
///
/// ```compile_fail
/// let mut config = cfgtree_core::parse("a = 1; b = \"x\";", "app.cfg").unwrap();
/// let mut other = config.clone();
/// std::mem::swap(&mut *config.lookup_mut("a").unwrap(), &mut *other.lookup_mut("b").unwrap());
/// ```
#[derive(Debug)]
pub struct SettingMut<'a> {
    setting: &'a mut Setting,
}

impl<'a> SettingMut<'a> {
    pub(crate) fn new(setting: &'a mut Setting) -> Self {
        SettingMut { setting }
    }

    /// Replaces the scalar value. The new value must have this setting's type;
    /// on failure the old value is kept.
    pub fn set(&mut self, value: impl Into<Value>) -> Result<()> {
        self.setting.set(value)
    }

    /// Sets how an integer is written. Ignored for every other type.
    pub fn set_format(&mut self, format: Format) {
        self.setting.set_format(format);
    }

    pub fn get_mut(&mut self, name: &str) -> Result<SettingMut<'_>> {
        self.setting.get_mut(name).map(SettingMut::new)
    }

    pub fn at_mut(&mut self, index: usize) -> Result<SettingMut<'_>> {
        self.setting.at_mut(index).map(SettingMut::new)
    }

    pub fn try_get_mut(&mut self, name: &str) -> Option<SettingMut<'_>> {
        self.setting.try_get_mut(name).map(SettingMut::new)
    }

    /// Resolves a path relative to this setting, like [`Setting::lookup`].
    pub fn lookup_mut(&mut self, path: &str) -> Result<SettingMut<'_>> {
        self.setting.lookup_mut(path).map(SettingMut::new)
    }

    /// Consumes the handle and resolves `path` below it, keeping the
    /// original borrow.
    pub fn into_lookup(self, path: &str) -> Result<SettingMut<'a>> {
        let setting = self.setting;
        setting.lookup_mut(path).map(SettingMut::new)
    }

    /// Adds an empty child called `name` of the given type to this group and
    /// returns it. Scalars start at zero, `""` or `false`.
    pub fn add(&mut self, name: &str, kind: SettingType) -> Result<SettingMut<'_>> {
        self.setting.add(name, kind).map(SettingMut::new)
    }

    /// Appends an unnamed element of the given type to this array or list.
    /// Arrays only take scalars, all of the type of their first element.
    pub fn push(&mut self, kind: SettingType) -> Result<SettingMut<'_>> {
        self.setting.push(kind).map(SettingMut::new)
    }

    /// [`SettingMut::add`] followed by [`SettingMut::set`].
    pub fn add_value(&mut self, name: &str, value: impl Into<Value>) -> Result<SettingMut<'_>> {
        self.setting.add_value(name, value).map(SettingMut::new)
    }

    /// [`SettingMut::push`] followed by [`SettingMut::set`].
    pub fn push_value(&mut self, value: impl Into<Value>) -> Result<SettingMut<'_>> {
        self.setting.push_value(value).map(SettingMut::new)
    }

    /// Removes the child called `name` and everything below it.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.setting.remove(name)
    }

    /// Removes the child at `index` of a group, array or list.
    pub fn remove_at(&mut self, index: usize) -> Result<()> {
        self.setting.remove_at(index)
    }
}

impl Deref for SettingMut<'_> {
    type Target = Setting;

    fn deref(&self) -> &Setting {
        &*self.setting
    }
}
