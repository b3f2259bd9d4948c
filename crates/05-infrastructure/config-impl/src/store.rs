//! 属性存储

use crate::providers::{EnvironmentSource, FileSource};
use config_abstractions::{PropertyExpr, PropertyResolver, PropertySource};
use infrastructure_common::{PropertyError, PropertyResult};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// 占位符解析的最大深度
pub const MAX_PLACEHOLDER_DEPTH: usize = 32;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "__default-config__.yml";

/// 应用配置文件名
pub const CONFIG_FILE: &str = "config.yml";

/// 扁平属性存储
///
/// 读取时递归解析 `${key}` / `${key:default}` 表达式，结果不做缓存。
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    properties: BTreeMap<String, String>,
}

impl PropertyStore {
    /// 创建空的属性存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 从键值创建
    pub fn from_map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut store = Self::new();
        store.extend(entries);
        store
    }

    /// 以进程环境变量为初始内容
    pub fn from_env() -> Self {
        let mut store = Self::new();
        store.extend(EnvironmentSource::new().collect(std::env::vars()));
        store
    }

    /// 以环境变量为底，依次叠加目录下的 `__default-config__.yml` 与 `config.yml`
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> PropertyResult<Self> {
        let dir = dir.as_ref();
        let mut store = Self::from_env();
        store.load_optional_file(dir.join(DEFAULT_CONFIG_FILE))?;
        store.load_optional_file(dir.join(CONFIG_FILE))?;
        info!("属性加载完成: {} ({} 个键)", dir.display(), store.len());
        Ok(store)
    }

    /// 设置属性
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// 批量设置属性
    pub fn extend<I, K, V>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.properties
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// 合并另一个解析器的全部原始键值，对方的值优先
    pub fn merge(&mut self, other: &dyn PropertyResolver) -> &mut Self {
        self.properties.extend(other.to_map());
        self
    }

    /// 合并一个属性来源
    pub fn add_source(&mut self, source: &dyn PropertySource) -> PropertyResult<&mut Self> {
        let entries = source.load()?;
        debug!("合并属性来源 {}: {} 个键", source.name(), entries.len());
        self.properties.extend(entries);
        Ok(self)
    }

    /// 加载 YAML 文本
    pub fn load_yaml_str(&mut self, content: &str) -> PropertyResult<&mut Self> {
        let entries = crate::providers::SourceFormat::Yaml.parse("yaml", content)?;
        self.properties.extend(entries);
        Ok(self)
    }

    /// 加载 TOML 文本
    pub fn load_toml_str(&mut self, content: &str) -> PropertyResult<&mut Self> {
        let entries = crate::providers::SourceFormat::Toml.parse("toml", content)?;
        self.properties.extend(entries);
        Ok(self)
    }

    /// 加载 JSON 文本
    pub fn load_json_str(&mut self, content: &str) -> PropertyResult<&mut Self> {
        let entries = crate::providers::SourceFormat::Json.parse("json", content)?;
        self.properties.extend(entries);
        Ok(self)
    }

    /// 加载配置文件，格式由扩展名决定
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> PropertyResult<&mut Self> {
        let source = FileSource::new(path)?;
        self.add_source(&source)
    }

    /// 加载配置文件，文件不存在时忽略
    pub fn load_optional_file<P: AsRef<Path>>(&mut self, path: P) -> PropertyResult<&mut Self> {
        let source = FileSource::new(path)?.optional();
        self.add_source(&source)
    }

    /// 键数量
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn lookup(&self, key: &str, chain: &mut Vec<String>) -> PropertyResult<Option<String>> {
        if let Some(expr) = PropertyExpr::parse(key)? {
            return self.resolve_expr(&expr, chain).map(Some);
        }

        let Some(raw) = self.properties.get(key) else {
            return Ok(None);
        };

        if chain.iter().any(|visited| visited == key) || chain.len() >= MAX_PLACEHOLDER_DEPTH {
            let mut path = chain.clone();
            path.push(key.to_string());
            return Err(PropertyError::CyclicPlaceholder {
                key: key.to_string(),
                chain: path.join(" -> "),
            });
        }

        chain.push(key.to_string());
        let resolved = self.parse_value(raw, chain);
        chain.pop();
        resolved.map(Some)
    }

    fn parse_value(&self, value: &str, chain: &mut Vec<String>) -> PropertyResult<String> {
        match PropertyExpr::parse(value)? {
            Some(expr) => self.resolve_expr(&expr, chain),
            None => Ok(value.to_string()),
        }
    }

    fn resolve_expr(&self, expr: &PropertyExpr, chain: &mut Vec<String>) -> PropertyResult<String> {
        match &expr.default_value {
            Some(default_value) => match self.lookup(&expr.key, chain)? {
                Some(value) => Ok(value),
                None => self.parse_value(default_value, chain),
            },
            None => self
                .lookup(&expr.key, chain)?
                .ok_or_else(|| PropertyError::missing_key(expr.key.as_str())),
        }
    }
}

impl PropertyResolver for PropertyStore {
    fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    fn get(&self, key: &str) -> PropertyResult<Option<String>> {
        self.lookup(key, &mut Vec::new())
    }

    fn get_or(&self, key: &str, default_value: &str) -> PropertyResult<String> {
        let mut chain = Vec::new();
        match self.lookup(key, &mut chain)? {
            Some(value) => Ok(value),
            None => self.parse_value(default_value, &mut chain),
        }
    }

    fn to_map(&self) -> BTreeMap<String, String> {
        self.properties.clone()
    }
}
