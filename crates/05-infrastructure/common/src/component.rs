//! 组件实例句柄与状态定义

use crate::metadata::TypeInfo;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 组件实例的稳定标识（共享值的地址）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(usize);

/// 类型擦除的组件句柄
///
/// 内部保存一个 `Arc<T>`，`T` 可以是具体类型或 `dyn Trait`。
/// 克隆句柄不会改变标识；对同一个 `Arc` 再次包装得到相同的标识。
#[derive(Clone)]
pub struct Instance {
    id: InstanceId,
    type_info: TypeInfo,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// 包装共享组件
    pub fn new<T>(value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let id = InstanceId(Arc::as_ptr(&value) as *const () as usize);
        Self {
            id,
            type_info: TypeInfo::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// 对象标识
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// 句柄暴露的类型
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 是否以指定类型暴露
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_info.is::<T>()
    }

    /// 取回具体的共享引用
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    /// 是否指向同一个对象
    pub fn same_identity(&self, other: &Instance) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("type", &self.type_info.name)
            .finish()
    }
}

/// 组件定义的生命周期状态
///
/// 状态只能向前推进，`Destroyed` 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentState {
    /// 已定义，尚未创建
    #[default]
    Defined,
    /// 创建中（实例可能已作为早期引用暴露）
    Creating,
    /// 已完成创建与初始化
    Created,
    /// 已销毁
    Destroyed,
}

impl ComponentState {
    /// 是否允许迁移到目标状态
    pub fn can_transition_to(self, next: ComponentState) -> bool {
        use ComponentState::*;
        matches!(
            (self, next),
            (Defined, Creating)
                | (Creating, Created)
                | (Defined, Destroyed)
                | (Creating, Destroyed)
                | (Created, Destroyed)
        )
    }
}
