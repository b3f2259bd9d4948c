//! 元数据定义
//!
//! 提供类型信息与注解模型。注解不依赖运行时反射，而是由扫描器在构建期
//! 以数据的形式产出，并可以携带元注解（注解上的注解）。

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 类型信息
///
/// 相等性只比较 [`TypeId`]，名称仅用于日志与错误信息。
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    /// 完整类型名称
    pub name: &'static str,
    /// 类型ID
    pub id: TypeId,
}

impl TypeInfo {
    /// 从类型获取类型信息（支持 `dyn Trait`）
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径与泛型参数）
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base).trim()
    }

    /// 默认组件名称：简短类型名首字母小写
    pub fn default_component_name(&self) -> String {
        let short = self.short_name();
        let short = short.strip_prefix("dyn ").unwrap_or(short);
        let mut chars = short.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// 是否为指定类型
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 注解属性值
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// 核心库命名空间，递归查找元注解时在此短路
const CORE_NAMESPACES: &[&str] = &["std", "core", "alloc"];

/// 注解
///
/// 例如 `@Configuration("app")` 表示为命名空间 `autumn`、名称 `Configuration`、
/// 属性 `value = "app"`，并携带元注解 `@Component`。
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// 命名空间（对应声明注解的模块）
    pub namespace: String,
    /// 注解名称
    pub name: String,
    /// 属性
    pub attributes: BTreeMap<String, AttributeValue>,
    /// 元注解
    pub meta: Vec<Annotation>,
}

impl Annotation {
    /// 创建新的注解
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            attributes: BTreeMap::new(),
            meta: Vec::new(),
        }
    }

    /// 创建容器自身命名空间下的标记注解
    pub fn marker(name: &str) -> Self {
        Self::new(markers::NAMESPACE, name)
    }

    /// 设置属性
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 添加元注解
    pub fn with_meta(mut self, meta: Annotation) -> Self {
        self.meta.push(meta);
        self
    }

    /// 是否为指定的容器标记
    pub fn is_marker(&self, name: &str) -> bool {
        self.namespace == markers::NAMESPACE && self.name == name
    }

    /// 是否来自核心库命名空间
    pub fn is_core_library(&self) -> bool {
        let root = self.namespace.split("::").next().unwrap_or_default();
        CORE_NAMESPACES.contains(&root)
    }

    /// 完整名称
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }

    /// 获取属性
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// 获取字符串属性
    pub fn str_attribute(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key) {
            Some(AttributeValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// 获取非空字符串属性
    pub fn non_empty_str_attribute(&self, key: &str) -> Option<&str> {
        self.str_attribute(key).filter(|value| !value.is_empty())
    }

    /// 获取布尔属性
    pub fn bool_attribute(&self, key: &str) -> Option<bool> {
        match self.attributes.get(key) {
            Some(AttributeValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// 获取整数属性
    pub fn int_attribute(&self, key: &str) -> Option<i64> {
        match self.attributes.get(key) {
            Some(AttributeValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// 获取列表属性（单个字符串视为单元素列表）
    pub fn list_attribute(&self, key: &str) -> Vec<String> {
        match self.attributes.get(key) {
            Some(AttributeValue::List(values)) => values.clone(),
            Some(AttributeValue::Str(value)) => vec![value.clone()],
            _ => Vec::new(),
        }
    }
}

/// 在注解列表中查找直接标注的容器标记（不递归）
pub fn find_direct_marker<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|annotation| annotation.is_marker(name))
}

/// 容器识别的标记名称
pub mod markers {
    /// 容器标记所在的命名空间
    pub const NAMESPACE: &str = "autumn";

    pub const COMPONENT: &str = "Component";
    pub const CONFIGURATION: &str = "Configuration";
    pub const BEAN: &str = "Bean";
    pub const AUTOWIRED: &str = "Autowired";
    pub const VALUE: &str = "Value";
    pub const PRIMARY: &str = "Primary";
    pub const ORDER: &str = "Order";
    pub const LAZY: &str = "Lazy";
    pub const AROUND: &str = "Around";
    pub const POST_CONSTRUCT: &str = "PostConstruct";
    pub const PRE_DESTROY: &str = "PreDestroy";
    pub const SUBSCRIBE: &str = "Subscribe";

    /// 通用属性名
    pub const VALUE_ATTRIBUTE: &str = "value";
}
