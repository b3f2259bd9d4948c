//! 组件容器
//!
//! [`ContainerBuilder`] 在单线程上完成注册、依赖图校验与预创建；
//! 构建完成的 [`Container`] 可以被多个线程并发查询。

use crate::eventbus::{EventBus, EventBusConfig, EventSubscriberProcessor, ShutdownPolicy};
use crate::interception::InterceptionEngine;
use crate::lifecycle::{InjectionPhase, LifecycleManager};
use crate::registry::DefinitionRegistry;
use crate::resolver::{CreationPlan, GraphResolver};
use config_abstractions::{ConversionService, PropertyResolver, PropertyResolverExt};
use config_impl::PropertyStore;
use di_abstractions::{
    ComponentContainer, ComponentContainerExt, ComponentDefinition, ComponentPostProcessor, CreationContext,
    Exposure, InvokeFn, LifecycleHook, TypeDescriptor,
};
use infrastructure_common::{
    ComponentState, ContainerResult, DependencyError, Instance, PropertyError, PropertyResult, TypeInfo,
};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// 容器配置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerConfig {
    pub event_bus: EventBusConfig,
}

impl ContainerConfig {
    pub const EVENT_BUS_ENABLED: &'static str = "autumn.event-bus.enabled";
    pub const EVENT_BUS_WORKER_THREADS: &'static str = "autumn.event-bus.worker-threads";
    pub const EVENT_BUS_SHUTDOWN: &'static str = "autumn.event-bus.shutdown";
    pub const EVENT_BUS_SHUTDOWN_TIMEOUT: &'static str = "autumn.event-bus.shutdown-timeout";

    /// 从属性中读取配置，缺失的键使用默认值
    pub fn from_properties(properties: &dyn PropertyResolver) -> PropertyResult<Self> {
        let defaults = EventBusConfig::default();
        let enabled = properties.get_typed_or(Self::EVENT_BUS_ENABLED, defaults.enabled)?;
        let worker_threads =
            properties.get_typed_or::<usize>(Self::EVENT_BUS_WORKER_THREADS, defaults.worker_threads)?;
        let timeout =
            properties.get_typed_or::<Duration>(Self::EVENT_BUS_SHUTDOWN_TIMEOUT, Duration::from_secs(5))?;

        let shutdown = match properties.get(Self::EVENT_BUS_SHUTDOWN)? {
            None => ShutdownPolicy::Drain(timeout),
            Some(policy) => match policy.trim().to_ascii_lowercase().as_str() {
                "drain" => ShutdownPolicy::Drain(timeout),
                "abandon" => ShutdownPolicy::Abandon,
                _ => {
                    return Err(PropertyError::ConversionFailed {
                        key: Self::EVENT_BUS_SHUTDOWN.to_string(),
                        value: policy,
                        type_name: "ShutdownPolicy".to_string(),
                        reason: "可选值为 drain 或 abandon".to_string(),
                    })
                }
            },
        };

        Ok(Self {
            event_bus: EventBusConfig {
                enabled,
                worker_threads,
                shutdown,
            },
        })
    }
}

struct SuppliedComponent {
    name: String,
    instance: Instance,
    exposures: Vec<Exposure>,
}

/// 容器构建器
pub struct ContainerBuilder {
    properties: PropertyStore,
    descriptors: Vec<TypeDescriptor>,
    supplied: Vec<SuppliedComponent>,
    post_processors: Vec<Arc<dyn ComponentPostProcessor>>,
    conversions: ConversionService,
    config: Option<ContainerConfig>,
}

impl ContainerBuilder {
    pub fn new(properties: PropertyStore) -> Self {
        Self {
            properties,
            descriptors: Vec::new(),
            supplied: Vec::new(),
            post_processors: Vec::new(),
            conversions: ConversionService::default(),
            config: None,
        }
    }

    /// 添加候选类型
    pub fn register(mut self, descriptor: TypeDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn register_all<I>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = TypeDescriptor>,
    {
        self.descriptors.extend(descriptors);
        self
    }

    /// 注册预先构建的实例
    pub fn register_instance<T>(self, name: &str, value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_supplied(name, Instance::new(value), vec![Exposure::identity::<T>()])
    }

    /// 注册预先构建的实例，并声明其可暴露的视图
    pub fn register_supplied(mut self, name: &str, instance: Instance, exposures: Vec<Exposure>) -> Self {
        self.supplied.push(SuppliedComponent {
            name: name.to_string(),
            instance,
            exposures,
        });
        self
    }

    /// 添加后处理器，排在内置处理器之后
    pub fn with_post_processor(mut self, processor: Arc<dyn ComponentPostProcessor>) -> Self {
        self.post_processors.push(processor);
        self
    }

    pub fn with_conversions(mut self, conversions: ConversionService) -> Self {
        self.conversions = conversions;
        self
    }

    /// 显式指定配置；未指定时从属性读取
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 构建容器
    ///
    /// 任何错误都会中止构建，并销毁已经创建的组件。
    pub fn build(self) -> ContainerResult<Container> {
        let config = match self.config {
            Some(config) => config,
            None => ContainerConfig::from_properties(&self.properties)?,
        };
        let properties = Arc::new(self.properties);

        let event_bus = if config.event_bus.enabled {
            Some(Arc::new(EventBus::new(config.event_bus.clone())?))
        } else {
            None
        };

        let mut registry = DefinitionRegistry::new();
        if let Some(bus) = &event_bus {
            let close: InvokeFn = Arc::new(|instance: &Instance, _args: &[&(dyn Any + Send + Sync)]| {
                if let Some(bus) = instance.downcast::<EventBus>() {
                    bus.close();
                }
                Ok(())
            });
            registry.register_instance(
                EventBus::COMPONENT_NAME,
                Instance::new(Arc::clone(bus)),
                Vec::new(),
                Some(LifecycleHook::new("close", close)),
            )?;
        }
        for supplied in self.supplied {
            registry.register_instance(&supplied.name, supplied.instance, supplied.exposures, None)?;
        }
        for descriptor in self.descriptors {
            registry.register(descriptor)?;
        }
        let registry = Arc::new(registry);
        info!("组件定义注册完成, 共 {} 个", registry.len());

        let plan = GraphResolver::new().plan(&registry)?;

        let lifecycle = LifecycleManager::new(
            Arc::clone(&registry),
            properties.clone() as Arc<dyn PropertyResolver>,
            self.conversions,
        );
        lifecycle.add_post_processor(Arc::new(InterceptionEngine::new()));
        if let Some(bus) = &event_bus {
            lifecycle.add_post_processor(Arc::new(EventSubscriberProcessor::new(Arc::clone(bus))));
        }
        for processor in self.post_processors {
            lifecycle.add_post_processor(processor);
        }

        let container = Container {
            registry,
            lifecycle,
            properties,
            event_bus,
            closed: AtomicBool::new(false),
        };
        if let Err(e) = container.start(&plan) {
            error!("容器启动失败: {}", e);
            container.close();
            return Err(e);
        }

        info!("容器启动完成, 已创建 {} 个组件", container.lifecycle.creation_order().len());
        Ok(container)
    }
}

/// 组件容器
pub struct Container {
    registry: Arc<DefinitionRegistry>,
    lifecycle: LifecycleManager,
    properties: Arc<PropertyStore>,
    event_bus: Option<Arc<EventBus>>,
    closed: AtomicBool,
}

impl Container {
    pub fn builder(properties: PropertyStore) -> ContainerBuilder {
        ContainerBuilder::new(properties)
    }

    fn start(&self, plan: &CreationPlan) -> ContainerResult<()> {
        let processor_type = TypeInfo::of::<dyn ComponentPostProcessor>();
        for definition in &plan.post_processors {
            let instance = self.lifecycle.create_bean(definition, InjectionPhase::Construction)?;
            let processor = definition
                .view_of(&instance, &processor_type)
                .and_then(|view| view.downcast::<dyn ComponentPostProcessor>())
                .ok_or_else(|| DependencyError::TypeMismatch {
                    name: definition.name.clone(),
                    expected: processor_type.name.to_string(),
                })?;
            self.lifecycle.add_post_processor(processor);
        }

        for definition in &plan.eager {
            self.lifecycle.create_bean(definition, InjectionPhase::Construction)?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> ContainerResult<()> {
        if self.is_closed() {
            return Err(DependencyError::ContainerClosed.into());
        }
        Ok(())
    }

    /// 取回组件实例，延迟组件在此时创建
    fn instance_of(&self, definition: &Arc<ComponentDefinition>) -> ContainerResult<Instance> {
        self.ensure_open()?;
        if let Some(instance) = definition.instance().filter(|_| definition.state() == ComponentState::Created) {
            return Ok(instance);
        }
        debug!("按需创建组件: {}", definition.name);
        self.lifecycle.create_bean(definition, InjectionPhase::Construction)
    }

    fn view(&self, definition: &Arc<ComponentDefinition>, type_info: &TypeInfo) -> ContainerResult<Instance> {
        let instance = self.instance_of(definition)?;
        definition.view_of(&instance, type_info).ok_or_else(|| {
            DependencyError::TypeMismatch {
                name: definition.name.clone(),
                expected: type_info.name.to_string(),
            }
            .into()
        })
    }

    /// 按类型获取组件
    pub fn get_bean<T>(&self) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ComponentContainerExt::get_bean(self)
    }

    /// 按名称获取组件并转换为指定类型
    pub fn get_bean_named<T>(&self, name: &str) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ComponentContainerExt::get_bean_named(self, name)
    }

    /// 按类型获取全部组件，按 `(order, 注册顺序)` 排列
    pub fn get_beans<T>(&self) -> ContainerResult<Vec<(String, Arc<T>)>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ComponentContainerExt::get_beans(self)
    }

    pub fn definition(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.registry.find_by_name(name)
    }

    pub fn definitions(&self) -> &[Arc<ComponentDefinition>] {
        self.registry.all_definitions()
    }

    /// 获取早期引用
    pub fn create_early_reference(&self, name: &str) -> ContainerResult<Instance> {
        self.ensure_open()?;
        self.lifecycle.create_early_reference(name)
    }

    /// 已创建组件的名称，按创建完成的顺序
    pub fn creation_order(&self) -> Vec<String> {
        self.lifecycle.creation_order()
    }

    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 关闭容器并按创建的逆序销毁组件，可重复调用
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("关闭容器");
        self.lifecycle.destroy_all();
        if let Some(bus) = &self.event_bus {
            bus.close();
        }
    }
}

impl ComponentContainer for Container {
    fn get_bean_by_name(&self, name: &str) -> ContainerResult<Option<Instance>> {
        match self.registry.find_by_name(name) {
            Some(definition) => self.instance_of(&definition).map(Some),
            None => Ok(None),
        }
    }

    fn get_bean_of(&self, type_info: &TypeInfo) -> ContainerResult<Instance> {
        let definition = self
            .registry
            .find_unique_by_type(type_info)?
            .ok_or_else(|| DependencyError::NotFound {
                type_name: type_info.name.to_string(),
            })?;
        self.view(&definition, type_info)
    }

    fn get_beans_of(&self, type_info: &TypeInfo) -> ContainerResult<Vec<(String, Instance)>> {
        self.registry
            .find_by_type(type_info)
            .iter()
            .map(|definition| Ok((definition.name.clone(), self.view(definition, type_info)?)))
            .collect()
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.registry.find_by_name(name).is_some()
    }

    fn definition_names(&self) -> Vec<String> {
        self.registry
            .all_definitions()
            .iter()
            .map(|definition| definition.name.clone())
            .collect()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("definitions", &self.registry.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
