//! 基于 `@Around` 的拦截后处理器

use di_abstractions::{
    ComponentDefinition, ComponentPostProcessor, CreationContext, InterceptorChain, InvocationHandler,
};
use infrastructure_common::{
    ContainerError, ContainerResult, DependencyError, Instance, InterceptionError, TypeInfo,
};
use std::sync::Arc;
use tracing::{debug, info};

/// 拦截引擎
///
/// 在初始化钩子之前为带有拦截绑定的组件生成代理。处理器以早期引用的方式获取，
/// 因此处理器与被拦截组件之间的字段循环依赖是允许的。
#[derive(Debug, Default)]
pub struct InterceptionEngine;

impl InterceptionEngine {
    pub const NAME: &'static str = "interceptionEngine";

    pub fn new() -> Self {
        Self
    }

    fn resolve_handler(
        &self,
        component: &str,
        handler: &str,
        context: &dyn CreationContext,
    ) -> ContainerResult<Arc<dyn InvocationHandler>> {
        let view = context
            .create_early_reference_as(handler, &TypeInfo::of::<dyn InvocationHandler>())
            .map_err(|error| match error {
                ContainerError::Dependency {
                    source: DependencyError::NotFoundByName { .. },
                } => InterceptionError::HandlerNotFound {
                    component: component.to_string(),
                    handler: handler.to_string(),
                }
                .into(),
                ContainerError::Dependency {
                    source: DependencyError::TypeMismatch { .. },
                } => InterceptionError::InvalidHandler {
                    component: component.to_string(),
                    handler: handler.to_string(),
                }
                .into(),
                other => other,
            })?;

        view.downcast::<dyn InvocationHandler>().ok_or_else(|| {
            InterceptionError::InvalidHandler {
                component: component.to_string(),
                handler: handler.to_string(),
            }
            .into()
        })
    }
}

impl ComponentPostProcessor for InterceptionEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn before_initialization(
        &self,
        instance: Instance,
        definition: &ComponentDefinition,
        context: &dyn CreationContext,
    ) -> ContainerResult<Instance> {
        let Some(binding) = &definition.interception else {
            return Ok(instance);
        };
        let component = definition.name.as_str();

        let proxy = definition
            .proxy
            .as_ref()
            .ok_or_else(|| InterceptionError::ProxyUnavailable {
                component: component.to_string(),
                type_name: definition.declared_type.name.to_string(),
            })?;
        if !definition.exposes(&proxy.type_info) {
            return Err(InterceptionError::ProxyTypeMismatch {
                component: component.to_string(),
                type_name: proxy.type_info.name.to_string(),
            }
            .into());
        }

        let mut handlers = Vec::with_capacity(binding.handlers.len());
        for handler in &binding.handlers {
            debug!("解析拦截处理器: {} -> {}", component, handler);
            handlers.push((handler.clone(), self.resolve_handler(component, handler, context)?));
        }

        let chain = Arc::new(InterceptorChain::new(component, handlers));
        let proxied = (proxy.factory)(&instance, chain).ok_or_else(|| InterceptionError::ProxyTypeMismatch {
            component: component.to_string(),
            type_name: instance.type_info().name.to_string(),
        })?;

        info!(
            "为组件 {} 创建代理 {}, 处理器: {:?}",
            component, proxy.type_info, binding.handlers
        );
        Ok(proxied)
    }
}
