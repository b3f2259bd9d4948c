//! 字段注入槽

use anyhow::anyhow;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// 组件字段上的注入槽
///
/// 容器在构造之后、初始化之前写入一次；循环依赖时写入的可能是尚未初始化完成的早期引用。
///
/// 持有的是强引用。两个组件互相注入时形成 `Arc` 环，容器关闭后也不会释放，
/// 需要释放的资源应放在 `@PreDestroy` 中处理。
pub struct Autowired<T: ?Sized> {
    cell: OnceCell<Arc<T>>,
}

impl<T: ?Sized> Autowired<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// 写入依赖，重复写入会失败
    pub fn inject(&self, value: Arc<T>) -> anyhow::Result<()> {
        self.cell
            .set(value)
            .map_err(|_| anyhow!("字段已注入: {}", std::any::type_name::<T>()))
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.cell.get()
    }

    /// 获取依赖，未注入时返回错误
    pub fn require(&self) -> anyhow::Result<&Arc<T>> {
        self.cell
            .get()
            .ok_or_else(|| anyhow!("字段尚未注入: {}", std::any::type_name::<T>()))
    }

    pub fn is_injected(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: ?Sized> Default for Autowired<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Autowired<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autowired")
            .field("type", &std::any::type_name::<T>())
            .field("injected", &self.is_injected())
            .finish()
    }
}
