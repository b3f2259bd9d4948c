//! 属性解析器抽象接口

use crate::conversion::{convert_property, FromPropertyValue};
use infrastructure_common::{PropertyError, PropertyResult};
use std::collections::BTreeMap;

/// 属性解析器 trait
///
/// 键与值都可以是占位符表达式，读取时递归解析。
pub trait PropertyResolver: Send + Sync {
    /// 检查键是否存在（不解析表达式）
    fn contains(&self, key: &str) -> bool;

    /// 获取解析后的属性值
    ///
    /// 键本身为 `${key}` 且不存在时返回 [`PropertyError::MissingKey`]。
    fn get(&self, key: &str) -> PropertyResult<Option<String>>;

    /// 获取属性值，不存在时解析并返回默认值
    fn get_or(&self, key: &str, default_value: &str) -> PropertyResult<String>;

    /// 获取必需的属性值
    fn get_required(&self, key: &str) -> PropertyResult<String> {
        self.get(key)?
            .ok_or_else(|| PropertyError::missing_key(key))
    }

    /// 导出所有原始键值
    fn to_map(&self) -> BTreeMap<String, String>;
}

/// 类型化读取扩展
pub trait PropertyResolverExt: PropertyResolver {
    /// 获取并转换属性值
    fn get_typed<T: FromPropertyValue>(&self, key: &str) -> PropertyResult<Option<T>> {
        match self.get(key)? {
            Some(value) => convert_property(key, &value).map(Some),
            None => Ok(None),
        }
    }

    /// 获取并转换属性值，不存在时返回默认值
    fn get_typed_or<T: FromPropertyValue>(&self, key: &str, default_value: T) -> PropertyResult<T> {
        Ok(self.get_typed(key)?.unwrap_or(default_value))
    }

    /// 获取并转换必需的属性值
    fn get_required_typed<T: FromPropertyValue>(&self, key: &str) -> PropertyResult<T> {
        self.get_typed(key)?
            .ok_or_else(|| PropertyError::missing_key(key))
    }
}

impl<R: PropertyResolver + ?Sized> PropertyResolverExt for R {}
