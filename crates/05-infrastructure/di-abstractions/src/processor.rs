//! 组件后处理扩展点

use crate::definition::ComponentDefinition;
use infrastructure_common::{ContainerResult, Instance, TypeInfo};
use std::sync::Arc;

/// 创建过程中向后处理器开放的容器能力
pub trait CreationContext: Send + Sync {
    /// 获取组件的早期引用
    ///
    /// 组件已创建时返回其实例；正在创建时返回原始对象；尚未创建时立即创建。
    fn create_early_reference(&self, name: &str) -> ContainerResult<Instance>;

    /// 获取早期引用并转换为指定类型的视图
    fn create_early_reference_as(&self, name: &str, type_info: &TypeInfo) -> ContainerResult<Instance>;

    /// 按名称查找定义
    fn definition(&self, name: &str) -> Option<Arc<ComponentDefinition>>;
}

/// 组件后处理器
///
/// 在每个组件的初始化钩子前后被调用，可以返回替换后的实例（例如代理）。
/// 后处理器自身也可以是容器组件，它们会先于其它组件创建。
pub trait ComponentPostProcessor: Send + Sync {
    /// 处理器名称，用于日志
    fn name(&self) -> &str;

    /// 初始化钩子之前调用
    fn before_initialization(
        &self,
        instance: Instance,
        _definition: &ComponentDefinition,
        _context: &dyn CreationContext,
    ) -> ContainerResult<Instance> {
        Ok(instance)
    }

    /// 初始化钩子之后调用
    fn after_initialization(
        &self,
        instance: Instance,
        _definition: &ComponentDefinition,
        _context: &dyn CreationContext,
    ) -> ContainerResult<Instance> {
        Ok(instance)
    }
}
