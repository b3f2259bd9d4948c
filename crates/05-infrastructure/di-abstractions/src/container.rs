//! 组件容器抽象接口
//!
//! 提供按名称、按类型查找组件的核心抽象

use infrastructure_common::{ContainerResult, DependencyError, Instance, TypeInfo};
use std::sync::Arc;

/// 组件容器 trait
pub trait ComponentContainer: Send + Sync {
    /// 按名称获取组件，名称不存在时返回 `None`
    fn get_bean_by_name(&self, name: &str) -> ContainerResult<Option<Instance>>;

    /// 按类型获取唯一组件
    ///
    /// 多个候选时取唯一的首选组件，否则返回 [`DependencyError::Ambiguous`]。
    fn get_bean_of(&self, type_info: &TypeInfo) -> ContainerResult<Instance>;

    /// 按类型获取全部组件，按 `(order, 注册顺序)` 排列
    fn get_beans_of(&self, type_info: &TypeInfo) -> ContainerResult<Vec<(String, Instance)>>;

    /// 是否存在指定名称的组件
    fn contains_bean(&self, name: &str) -> bool;

    /// 所有组件名称，按注册顺序
    fn definition_names(&self) -> Vec<String>;
}

/// 带类型的便捷方法
pub trait ComponentContainerExt: ComponentContainer {
    /// 按类型获取组件
    fn get_bean<T>(&self) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_info = TypeInfo::of::<T>();
        let instance = self.get_bean_of(&type_info)?;
        downcast_instance(instance, &type_info)
    }

    /// 按名称获取组件并转换为指定类型
    fn get_bean_named<T>(&self, name: &str) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = self
            .get_bean_by_name(name)?
            .ok_or_else(|| DependencyError::NotFoundByName { name: name.to_string() })?;
        instance.downcast::<T>().ok_or_else(|| {
            DependencyError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            }
            .into()
        })
    }

    /// 按类型获取全部组件
    fn get_beans<T>(&self) -> ContainerResult<Vec<(String, Arc<T>)>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_info = TypeInfo::of::<T>();
        self.get_beans_of(&type_info)?
            .into_iter()
            .map(|(name, instance)| Ok((name, downcast_instance(instance, &type_info)?)))
            .collect()
    }
}

impl<C: ComponentContainer + ?Sized> ComponentContainerExt for C {}

fn downcast_instance<T>(instance: Instance, type_info: &TypeInfo) -> ContainerResult<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance.downcast::<T>().ok_or_else(|| {
        DependencyError::TypeMismatch {
            name: instance.type_info().name.to_string(),
            expected: type_info.name.to_string(),
        }
        .into()
    })
}
