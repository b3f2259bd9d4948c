//! 组件生命周期管理
//!
//! 按需创建组件：构造、登记早期引用、字段注入、后处理、初始化钩子。
//! 字段注入阶段允许循环引用（拿到的是尚未初始化完成的原始对象），构造阶段不允许。

use crate::eventbus::EventBus;
use crate::registry::DefinitionRegistry;
use config_abstractions::{ConversionService, PropertyResolver};
use di_abstractions::{
    Arguments, ComponentDefinition, ComponentPostProcessor, CreationContext, CreationSource, DependencyKind,
    DependencySpec, Injected,
};
use infrastructure_common::{
    ComponentState, ContainerResult, DependencyError, Instance, PropertyError, TypeInfo,
};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 依赖被请求的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPhase {
    /// 构造器或工厂方法参数
    Construction,
    /// 字段注入或早期引用
    Property,
}

/// 生命周期管理器
pub struct LifecycleManager {
    registry: Arc<DefinitionRegistry>,
    properties: Arc<dyn PropertyResolver>,
    conversions: ConversionService,
    post_processors: RwLock<Vec<Arc<dyn ComponentPostProcessor>>>,
    /// 创建完成的顺序，销毁时逆序
    creation_order: Mutex<Vec<Arc<ComponentDefinition>>>,
    /// 正在创建的组件栈，用于报告循环链
    creating: Mutex<Vec<String>>,
    /// 本轮创建中的 (使用者, 提供者)，最外层创建结束时清空
    handed_out: Mutex<Vec<(String, String)>>,
    creation_lock: ReentrantMutex<()>,
}

impl LifecycleManager {
    pub fn new(
        registry: Arc<DefinitionRegistry>,
        properties: Arc<dyn PropertyResolver>,
        conversions: ConversionService,
    ) -> Self {
        Self {
            registry,
            properties,
            conversions,
            post_processors: RwLock::new(Vec::new()),
            creation_order: Mutex::new(Vec::new()),
            creating: Mutex::new(Vec::new()),
            handed_out: Mutex::new(Vec::new()),
            creation_lock: ReentrantMutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.registry
    }

    /// 追加后处理器，只影响之后创建的组件
    pub fn add_post_processor(&self, processor: Arc<dyn ComponentPostProcessor>) {
        debug!("注册后处理器: {}", processor.name());
        self.post_processors.write().push(processor);
    }

    pub fn post_processor_names(&self) -> Vec<String> {
        self.post_processors
            .read()
            .iter()
            .map(|processor| processor.name().to_string())
            .collect()
    }

    /// 已创建组件的名称，按创建完成的顺序
    pub fn creation_order(&self) -> Vec<String> {
        self.creation_order
            .lock()
            .iter()
            .map(|definition| definition.name.clone())
            .collect()
    }

    /// 创建（或取回）组件实例
    pub fn create_bean(
        &self,
        definition: &Arc<ComponentDefinition>,
        phase: InjectionPhase,
    ) -> ContainerResult<Instance> {
        let _guard = self.creation_lock.lock();

        let requester = self.creating.lock().last().cloned();
        let instance = self.obtain(definition, phase)?;
        if let Some(consumer) = requester {
            self.handed_out.lock().push((consumer, definition.name.clone()));
        }
        Ok(instance)
    }

    fn obtain(&self, definition: &Arc<ComponentDefinition>, phase: InjectionPhase) -> ContainerResult<Instance> {
        match definition.state() {
            ComponentState::Created => definition
                .instance()
                .ok_or_else(|| DependencyError::illegal_state(&definition.name, "已创建但没有实例").into()),
            ComponentState::Destroyed => {
                Err(DependencyError::illegal_state(&definition.name, "组件已销毁").into())
            }
            ComponentState::Creating => match (phase, definition.instance()) {
                (InjectionPhase::Property, Some(early)) => {
                    debug!("返回早期引用: {}", definition.name);
                    Ok(early)
                }
                _ => Err(DependencyError::UnresolvableCycle {
                    chain: self.cycle_chain(&definition.name),
                }
                .into()),
            },
            ComponentState::Defined => {
                definition.begin_creation()?;
                let mark = self.creation_order.lock().len();
                self.creating.lock().push(definition.name.clone());
                let result = self.do_create(definition);
                let outermost = {
                    let mut creating = self.creating.lock();
                    creating.pop();
                    creating.is_empty()
                };

                if let Err(error) = &result {
                    debug!("组件创建失败，回滚: {}, 原因: {}", definition.name, error);
                    if let Some(raw) = definition.raw_instance() {
                        self.release_subscriptions(&raw);
                    }
                    definition.abort_creation();
                    self.discard_dependents(definition, mark);
                }
                if outermost {
                    self.handed_out.lock().clear();
                }
                result
            }
        }
    }

    /// 丢弃本次创建期间完成、且直接或间接拿到失败组件早期引用的组件
    fn discard_dependents(&self, failed: &ComponentDefinition, mark: usize) {
        let window: Vec<Arc<ComponentDefinition>> = self
            .creation_order
            .lock()
            .get(mark..)
            .map(<[_]>::to_vec)
            .unwrap_or_default();
        if window.is_empty() {
            return;
        }

        let handed_out = self.handed_out.lock().clone();
        let mut tainted = HashSet::from([failed.name.clone()]);
        loop {
            let before = tainted.len();
            for definition in &window {
                if !tainted.contains(&definition.name)
                    && handed_out
                        .iter()
                        .any(|(consumer, provider)| consumer == &definition.name && tainted.contains(provider))
                {
                    tainted.insert(definition.name.clone());
                }
            }
            if tainted.len() == before {
                break;
            }
        }

        self.creation_order
            .lock()
            .retain(|definition| !tainted.contains(&definition.name));
        self.handed_out
            .lock()
            .retain(|(consumer, _)| !tainted.contains(consumer));

        for definition in window.iter().rev().filter(|d| tainted.contains(&d.name)) {
            warn!("组件依赖的 {} 创建失败，一并回滚: {}", failed.name, definition.name);
            if let Some(raw) = definition.raw_instance() {
                self.release_subscriptions(&raw);
                if let Some(hook) = &definition.destroy_hook {
                    if let Err(e) = hook.run(&raw) {
                        error!("回滚时销毁组件失败: {}::{}, 原因: {:#}", definition.name, hook.name, e);
                    }
                }
            }
            definition.discard();
        }
    }

    /// 被回滚的实例不再接收事件
    fn release_subscriptions(&self, raw: &Instance) {
        let bus = self
            .registry
            .find_by_name(EventBus::COMPONENT_NAME)
            .filter(|definition| definition.state() == ComponentState::Created)
            .and_then(|definition| definition.instance())
            .and_then(|instance| instance.downcast::<EventBus>());
        if let Some(bus) = bus {
            bus.unregister(raw);
        }
    }

    fn do_create(&self, definition: &Arc<ComponentDefinition>) -> ContainerResult<Instance> {
        debug!("开始创建组件: {}", definition.name);
        let name = definition.name.as_str();

        let raw = match &definition.source {
            CreationSource::Constructor {
                dependencies,
                construct,
            } => {
                let args = self.arguments(definition, dependencies)?;
                construct(&args).map_err(|e| DependencyError::creation_failed(name, e))?
            }
            CreationSource::FactoryMethod {
                owner,
                dependencies,
                invoke,
                ..
            } => {
                let owner_definition =
                    self.registry
                        .find_by_name(owner)
                        .ok_or_else(|| DependencyError::MissingDependency {
                            component: name.to_string(),
                            dependency: owner.clone(),
                        })?;
                let owner_instance = self.create_bean(&owner_definition, InjectionPhase::Construction)?;
                let owner_raw = owner_definition.raw_instance().unwrap_or(owner_instance);
                let args = self.arguments(definition, dependencies)?;
                invoke(&owner_raw, &args).map_err(|e| DependencyError::creation_failed(name, e))?
            }
            CreationSource::Supplied(instance) => instance.clone(),
        };
        definition.expose_early(raw.clone())?;

        for field in &definition.fields {
            let injected = self.injected(definition, &field.dependency, InjectionPhase::Property)?;
            (field.inject)(&raw, injected).map_err(|e| DependencyError::creation_failed(name, e))?;
        }

        let processors = self.post_processors.read().clone();
        let mut current = raw.clone();
        for processor in &processors {
            let next = processor.before_initialization(current.clone(), definition, self)?;
            if !next.same_identity(&current) {
                debug!("后处理器 {} 替换了组件 {}", processor.name(), name);
                definition.replace_instance(next.clone())?;
            }
            current = next;
        }

        if let Some(hook) = &definition.init_hook {
            debug!("调用初始化方法: {}::{}", name, hook.name);
            hook.run(&raw)
                .map_err(|e| DependencyError::creation_failed(name, e))?;
        }

        for processor in &processors {
            let next = processor.after_initialization(current.clone(), definition, self)?;
            if !next.same_identity(&current) {
                debug!("后处理器 {} 替换了组件 {}", processor.name(), name);
                definition.replace_instance(next.clone())?;
            }
            current = next;
        }

        let instance = definition.mark_created()?;
        self.creation_order.lock().push(definition.clone());
        info!("组件创建完成: {} ({})", name, instance.type_info());
        Ok(instance)
    }

    fn arguments(
        &self,
        definition: &ComponentDefinition,
        dependencies: &[DependencySpec],
    ) -> ContainerResult<Arguments> {
        let values = dependencies
            .iter()
            .map(|dependency| self.injected(definition, dependency, InjectionPhase::Construction))
            .collect::<ContainerResult<Vec<_>>>()?;
        Ok(Arguments::new(definition.name.clone(), values))
    }

    /// 解析一个注入值
    fn injected(
        &self,
        definition: &ComponentDefinition,
        dependency: &DependencySpec,
        phase: InjectionPhase,
    ) -> ContainerResult<Injected> {
        match &dependency.kind {
            DependencyKind::Value { expression } => {
                let raw = self
                    .properties
                    .get(expression)?
                    .ok_or_else(|| PropertyError::missing_key(expression.as_str()))?;
                let value = self.conversions.convert(expression, &raw, &dependency.target)?;
                Ok(Injected::Value(value))
            }
            DependencyKind::Component { .. } => {
                let Some(target) = self.registry.resolve(&definition.name, dependency)? else {
                    return Ok(Injected::Absent);
                };
                let instance = self.create_bean(&target, phase)?;
                let view = target
                    .view_of(&instance, &dependency.target)
                    .ok_or_else(|| DependencyError::TypeMismatch {
                        name: target.name.clone(),
                        expected: dependency.target.name.to_string(),
                    })?;
                Ok(Injected::Component(view))
            }
        }
    }

    fn cycle_chain(&self, name: &str) -> String {
        let creating = self.creating.lock();
        let start = creating.iter().position(|n| n == name).unwrap_or(0);
        let mut chain: Vec<&str> = creating[start..].iter().map(String::as_str).collect();
        chain.push(name);
        chain.join(" -> ")
    }

    /// 按创建的逆序销毁全部组件
    ///
    /// 单个销毁钩子失败只记录日志，不影响其余组件。
    pub fn destroy_all(&self) {
        let _guard = self.creation_lock.lock();
        let created = std::mem::take(&mut *self.creation_order.lock());

        for definition in created.iter().rev() {
            if let (Some(hook), Some(raw)) = (&definition.destroy_hook, definition.raw_instance()) {
                match hook.run(&raw) {
                    Ok(()) => debug!("组件已销毁: {}::{}", definition.name, hook.name),
                    Err(e) => error!("销毁组件失败: {}::{}, 原因: {:#}", definition.name, hook.name, e),
                }
            }
            definition.mark_destroyed();
        }

        for definition in self.registry.all_definitions() {
            if definition.state() != ComponentState::Destroyed {
                definition.mark_destroyed();
            }
        }
        info!("已销毁 {} 个组件", created.len());
    }
}

impl CreationContext for LifecycleManager {
    fn create_early_reference(&self, name: &str) -> ContainerResult<Instance> {
        let definition = self
            .registry
            .find_by_name(name)
            .ok_or_else(|| DependencyError::NotFoundByName { name: name.to_string() })?;
        self.create_bean(&definition, InjectionPhase::Property)
    }

    fn create_early_reference_as(&self, name: &str, type_info: &TypeInfo) -> ContainerResult<Instance> {
        let instance = self.create_early_reference(name)?;
        self.registry
            .find_by_name(name)
            .and_then(|definition| definition.view_of(&instance, type_info))
            .ok_or_else(|| {
                DependencyError::TypeMismatch {
                    name: name.to_string(),
                    expected: type_info.name.to_string(),
                }
                .into()
            })
    }

    fn definition(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.registry.find_by_name(name)
    }
}
