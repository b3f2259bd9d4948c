//! 属性来源实现

use config_abstractions::{FilePropertySource, PropertySource};
use infrastructure_common::{PropertyError, PropertyResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Yaml,
    Toml,
    Json,
}

impl SourceFormat {
    /// 根据扩展名推断格式
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yml" | "yaml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// 解析文本为扁平键值
    pub fn parse(self, origin: &str, content: &str) -> PropertyResult<BTreeMap<String, String>> {
        let tree = match self {
            Self::Yaml => {
                let value: serde_yaml::Value = serde_yaml::from_str(content)
                    .map_err(|e| PropertyError::source_load_failed(origin, e))?;
                yaml_to_json(&value)
            }
            Self::Toml => {
                let table: toml::Table = toml::from_str(content)
                    .map_err(|e| PropertyError::source_load_failed(origin, e))?;
                toml_to_json(&toml::Value::Table(table))
            }
            Self::Json => serde_json::from_str(content)
                .map_err(|e| PropertyError::source_load_failed(origin, e))?,
        };

        let mut entries = BTreeMap::new();
        flatten_into(&tree, String::new(), &mut entries);
        Ok(entries)
    }
}

/// 将 TOML 值转换为 JSON 值
fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number(serde_json::Number::from(*i)),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Array(arr) => Value::Array(arr.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
    }
}

/// 将 YAML 值转换为 JSON 值，非字符串的映射键按其文本形式保留
fn yaml_to_json(value: &serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => Value::String(n.to_string()),
        serde_yaml::Value::String(s) => Value::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(mapping) => Value::Object(
            mapping
                .iter()
                .filter_map(|(k, v)| scalar_text(&yaml_to_json(k)).map(|key| (key, yaml_to_json(v))))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 递归展开为点号分隔的键，序列以逗号连接，空值跳过
fn flatten_into(value: &Value, prefix: String, entries: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(obj) => {
            for (key, nested) in obj {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(nested, full_key, entries);
            }
        }
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(",");
            entries.insert(prefix, joined);
        }
        Value::Null => {}
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                entries.insert(prefix, text);
            }
        }
    }
}

/// 文件属性来源
#[derive(Debug)]
pub struct FileSource {
    file_path: PathBuf,
    format: SourceFormat,
    optional: bool,
    priority: i32,
}

impl FileSource {
    /// 创建新的文件属性来源，格式由扩展名决定
    pub fn new<P: AsRef<Path>>(path: P) -> PropertyResult<Self> {
        let file_path = path.as_ref().to_path_buf();
        let format = SourceFormat::from_path(&file_path).ok_or_else(|| {
            PropertyError::source_load_failed(
                file_path.display().to_string(),
                "无法识别的配置文件扩展名",
            )
        })?;

        Ok(Self {
            file_path,
            format,
            optional: false,
            priority: 100,
        })
    }

    /// 文件不存在时视为空来源
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 获取文件格式
    pub fn format(&self) -> SourceFormat {
        self.format
    }
}

impl PropertySource for FileSource {
    fn load(&self) -> PropertyResult<BTreeMap<String, String>> {
        if self.optional && !self.file_exists() {
            debug!("可选配置文件不存在，跳过: {}", self.file_path.display());
            return Ok(BTreeMap::new());
        }

        debug!("加载配置文件: {}", self.file_path.display());
        let origin = self.file_path.display().to_string();
        let content = std::fs::read_to_string(&self.file_path)
            .map_err(|e| PropertyError::source_load_failed(origin.clone(), e))?;

        let entries = self.format.parse(&origin, &content)?;
        debug!("配置文件加载完成: {} 个键", entries.len());
        Ok(entries)
    }

    fn name(&self) -> &str {
        match self.format {
            SourceFormat::Yaml => "YamlPropertySource",
            SourceFormat::Toml => "TomlPropertySource",
            SourceFormat::Json => "JsonPropertySource",
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

impl FilePropertySource for FileSource {
    fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// 环境变量属性来源
///
/// 不带前缀时原样导入所有环境变量；带前缀时去掉前缀，并把分隔符转换为点号、转为小写。
#[derive(Debug)]
pub struct EnvironmentSource {
    prefix: Option<String>,
    separator: String,
    priority: i32,
}

impl EnvironmentSource {
    /// 原样导入全部环境变量
    pub fn new() -> Self {
        Self {
            prefix: None,
            separator: "_".to_string(),
            priority: -100,
        }
    }

    /// 只导入带指定前缀的环境变量
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    /// 设置分隔符
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 将环境变量键转换为配置键
    fn env_key_to_config_key(&self, prefix: &str, env_key: &str) -> String {
        let key = env_key
            .strip_prefix(prefix)
            .unwrap_or(env_key)
            .trim_start_matches(self.separator.as_str());

        key.replace(self.separator.as_str(), ".").to_lowercase()
    }

    /// 从给定的变量集合中提取键值
    pub fn collect<I>(&self, vars: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        match &self.prefix {
            None => vars.into_iter().collect(),
            Some(prefix) => vars
                .into_iter()
                .filter(|(key, _)| key.starts_with(prefix.as_str()))
                .map(|(key, value)| (self.env_key_to_config_key(prefix, &key), value))
                .collect(),
        }
    }
}

impl Default for EnvironmentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySource for EnvironmentSource {
    fn load(&self) -> PropertyResult<BTreeMap<String, String>> {
        let entries = self.collect(std::env::vars());
        debug!("加载了 {} 个环境变量", entries.len());
        Ok(entries)
    }

    fn name(&self) -> &str {
        "EnvironmentPropertySource"
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
