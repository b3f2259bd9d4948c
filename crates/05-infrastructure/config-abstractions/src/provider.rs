//! 属性来源抽象接口

use infrastructure_common::PropertyResult;
use std::collections::BTreeMap;
use std::path::Path;

/// 属性来源 trait
///
/// 定义从不同数据源读取扁平键值的统一接口，嵌套结构按点号展开。
pub trait PropertySource: Send + Sync {
    /// 读取所有键值
    fn load(&self) -> PropertyResult<BTreeMap<String, String>>;

    /// 获取来源名称
    fn name(&self) -> &str;

    /// 获取来源优先级，数值大的后合并、覆盖先前的值
    fn priority(&self) -> i32 {
        0
    }
}

/// 文件属性来源 trait
pub trait FilePropertySource: PropertySource {
    /// 获取文件路径
    fn file_path(&self) -> &Path;

    /// 检查文件是否存在
    fn file_exists(&self) -> bool {
        self.file_path().exists()
    }
}

/// 按优先级合并多个来源
pub fn merge_sources(sources: &[Box<dyn PropertySource>]) -> PropertyResult<BTreeMap<String, String>> {
    let mut ordered: Vec<&dyn PropertySource> = sources.iter().map(|s| s.as_ref()).collect();
    ordered.sort_by_key(|source| source.priority());

    let mut merged = BTreeMap::new();
    for source in ordered {
        let entries = source.load()?;
        tracing::debug!("合并属性来源 {}: {} 个键", source.name(), entries.len());
        merged.extend(entries);
    }
    Ok(merged)
}
