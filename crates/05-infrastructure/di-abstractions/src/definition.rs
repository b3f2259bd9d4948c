//! 组件定义

use crate::descriptor::{
    ConstructFn, Exposure, FactoryFn, FieldInjectFn, InjectionPoint, InvokeFn, OperationDescriptor,
    ProxyDescriptor,
};
use crate::processor::ComponentPostProcessor;
use infrastructure_common::{
    find_direct_marker, markers, Annotation, ComponentState, DependencyError, DependencyResult,
    Instance, TypeInfo,
};
use parking_lot::RwLock;
use std::fmt;
use tracing::debug;

/// 未标注 `@Order` 时的排序值
pub const DEFAULT_ORDER: i32 = i32::MAX;

/// 依赖类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    /// 组件依赖，先按名称再按类型解析
    Component { name: Option<String>, required: bool },
    /// 配置值依赖
    Value { expression: String },
}

/// 依赖描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    /// 参数或字段名
    pub point: String,
    /// 目标类型
    pub target: TypeInfo,
    pub kind: DependencyKind,
}

impl DependencySpec {
    /// 由注入点上的注解推导依赖
    pub fn from_point(point: &InjectionPoint) -> Self {
        let kind = if let Some(value) = find_direct_marker(&point.annotations, markers::VALUE) {
            DependencyKind::Value {
                expression: value
                    .str_attribute(markers::VALUE_ATTRIBUTE)
                    .unwrap_or_default()
                    .to_string(),
            }
        } else if let Some(autowired) = find_direct_marker(&point.annotations, markers::AUTOWIRED) {
            DependencyKind::Component {
                name: autowired
                    .non_empty_str_attribute(crate::annotations::AutowiredAttributes::NAME)
                    .map(str::to_string),
                required: autowired
                    .bool_attribute(crate::annotations::AutowiredAttributes::REQUIRED)
                    .unwrap_or(true),
            }
        } else {
            DependencyKind::Component {
                name: None,
                required: true,
            }
        };

        Self {
            point: point.name.clone(),
            target: point.type_info,
            kind,
        }
    }

    /// 是否为组件依赖
    pub fn is_component(&self) -> bool {
        matches!(self.kind, DependencyKind::Component { .. })
    }

    pub fn describe(&self) -> String {
        match &self.kind {
            DependencyKind::Component { name: Some(name), .. } => {
                format!("{}: {} (名称 {})", self.point, self.target.name, name)
            }
            DependencyKind::Component { name: None, .. } => format!("{}: {}", self.point, self.target.name),
            DependencyKind::Value { expression } => format!("{}: {}", self.point, expression),
        }
    }
}

/// 组件的创建方式
#[derive(Clone)]
pub enum CreationSource {
    /// 调用构造器
    Constructor {
        dependencies: Vec<DependencySpec>,
        construct: ConstructFn,
    },
    /// 调用配置组件上的工厂方法
    FactoryMethod {
        owner: String,
        method: String,
        dependencies: Vec<DependencySpec>,
        invoke: FactoryFn,
    },
    /// 预先构建的实例
    Supplied(Instance),
}

impl CreationSource {
    /// 构造期依赖
    pub fn dependencies(&self) -> &[DependencySpec] {
        match self {
            CreationSource::Constructor { dependencies, .. }
            | CreationSource::FactoryMethod { dependencies, .. } => dependencies,
            CreationSource::Supplied(_) => &[],
        }
    }
}

impl fmt::Debug for CreationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationSource::Constructor { dependencies, .. } => f
                .debug_struct("Constructor")
                .field("dependencies", dependencies)
                .finish(),
            CreationSource::FactoryMethod {
                owner,
                method,
                dependencies,
                ..
            } => f
                .debug_struct("FactoryMethod")
                .field("owner", owner)
                .field("method", method)
                .field("dependencies", dependencies)
                .finish(),
            CreationSource::Supplied(instance) => f.debug_tuple("Supplied").field(instance).finish(),
        }
    }
}

/// 字段注入
#[derive(Clone)]
pub struct FieldInjection {
    pub dependency: DependencySpec,
    pub inject: FieldInjectFn,
}

impl fmt::Debug for FieldInjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dependency.fmt(f)
    }
}

/// 零参数的生命周期钩子
#[derive(Clone)]
pub struct LifecycleHook {
    pub name: String,
    pub invoke: InvokeFn,
}

impl LifecycleHook {
    pub fn new(name: impl Into<String>, invoke: InvokeFn) -> Self {
        Self {
            name: name.into(),
            invoke,
        }
    }

    pub fn from_operation(operation: &OperationDescriptor) -> Self {
        Self::new(operation.name.clone(), operation.invoker.clone())
    }

    /// 在原始对象上执行
    pub fn run(&self, instance: &Instance) -> anyhow::Result<()> {
        (self.invoke)(instance, &[])
    }
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// 拦截绑定：按顺序排列的处理器组件名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptionBinding {
    pub handlers: Vec<String>,
}

#[derive(Debug, Default)]
struct DefinitionSlot {
    state: ComponentState,
    raw: Option<Instance>,
    instance: Option<Instance>,
    replaced: bool,
}

/// 组件定义
pub struct ComponentDefinition {
    pub name: String,
    pub declared_type: TypeInfo,
    /// 注册顺序
    pub index: usize,
    pub source: CreationSource,
    pub fields: Vec<FieldInjection>,
    pub init_hook: Option<LifecycleHook>,
    pub destroy_hook: Option<LifecycleHook>,
    pub order: i32,
    pub primary: bool,
    pub lazy: bool,
    pub configuration: bool,
    pub interception: Option<InterceptionBinding>,
    pub operations: Vec<OperationDescriptor>,
    pub exposures: Vec<Exposure>,
    pub proxy: Option<ProxyDescriptor>,
    pub annotations: Vec<Annotation>,
    slot: RwLock<DefinitionSlot>,
}

/// 定义的静态部分，由注册表填写
#[derive(Debug)]
pub struct DefinitionParts {
    pub name: String,
    pub declared_type: TypeInfo,
    pub index: usize,
    pub source: CreationSource,
    pub fields: Vec<FieldInjection>,
    pub init_hook: Option<LifecycleHook>,
    pub destroy_hook: Option<LifecycleHook>,
    pub order: i32,
    pub primary: bool,
    pub lazy: bool,
    pub configuration: bool,
    pub interception: Option<InterceptionBinding>,
    pub operations: Vec<OperationDescriptor>,
    pub exposures: Vec<Exposure>,
    pub proxy: Option<ProxyDescriptor>,
    pub annotations: Vec<Annotation>,
}

impl From<DefinitionParts> for ComponentDefinition {
    fn from(parts: DefinitionParts) -> Self {
        Self {
            name: parts.name,
            declared_type: parts.declared_type,
            index: parts.index,
            source: parts.source,
            fields: parts.fields,
            init_hook: parts.init_hook,
            destroy_hook: parts.destroy_hook,
            order: parts.order,
            primary: parts.primary,
            lazy: parts.lazy,
            configuration: parts.configuration,
            interception: parts.interception,
            operations: parts.operations,
            exposures: parts.exposures,
            proxy: parts.proxy,
            annotations: parts.annotations,
            slot: RwLock::new(DefinitionSlot::default()),
        }
    }
}

impl ComponentDefinition {
    /// 当前状态
    pub fn state(&self) -> ComponentState {
        self.slot.read().state
    }

    /// 当前实例（可能是代理）
    pub fn instance(&self) -> Option<Instance> {
        self.slot.read().instance.clone()
    }

    /// 构造得到的原始对象
    pub fn raw_instance(&self) -> Option<Instance> {
        self.slot.read().raw.clone()
    }

    /// 是否暴露指定类型
    pub fn exposes(&self, type_info: &TypeInfo) -> bool {
        self.exposures.iter().any(|e| &e.type_info == type_info)
    }

    /// 将实例转换为指定类型的视图
    pub fn view_of(&self, instance: &Instance, type_info: &TypeInfo) -> Option<Instance> {
        self.exposures
            .iter()
            .find(|e| &e.type_info == type_info)
            .and_then(|e| e.view_of(instance))
    }

    /// 是否为后处理器组件
    pub fn is_post_processor(&self) -> bool {
        self.exposes(&TypeInfo::of::<dyn ComponentPostProcessor>())
    }

    /// 带有 `@Subscribe` 的操作
    pub fn subscriber_operations(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations
            .iter()
            .filter(|op| op.marker(markers::SUBSCRIBE).is_some())
    }

    /// 构造期依赖
    pub fn construction_dependencies(&self) -> &[DependencySpec] {
        self.source.dependencies()
    }

    /// 工厂方法所属的配置组件
    pub fn factory_owner(&self) -> Option<&str> {
        match &self.source {
            CreationSource::FactoryMethod { owner, .. } => Some(owner),
            _ => None,
        }
    }

    /// `Defined -> Creating`
    pub fn begin_creation(&self) -> DependencyResult<()> {
        let mut slot = self.slot.write();
        if !slot.state.can_transition_to(ComponentState::Creating) {
            return Err(DependencyError::illegal_state(
                &self.name,
                format!("无法从 {:?} 开始创建", slot.state),
            ));
        }
        slot.state = ComponentState::Creating;
        Ok(())
    }

    /// 构造完成后立即登记原始对象，供循环依赖中的早期引用使用
    pub fn expose_early(&self, raw: Instance) -> DependencyResult<()> {
        let mut slot = self.slot.write();
        if slot.state != ComponentState::Creating || slot.raw.is_some() {
            return Err(DependencyError::illegal_state(&self.name, "早期引用只能登记一次"));
        }
        slot.raw = Some(raw.clone());
        slot.instance = Some(raw);
        Ok(())
    }

    /// 后处理阶段用代理替换实例，最多一次
    pub fn replace_instance(&self, replacement: Instance) -> DependencyResult<()> {
        let mut slot = self.slot.write();
        if slot.state != ComponentState::Creating {
            return Err(DependencyError::illegal_state(&self.name, "只能在创建过程中替换实例"));
        }
        if slot
            .instance
            .as_ref()
            .is_some_and(|current| current.same_identity(&replacement) && current.type_info() == replacement.type_info())
        {
            return Ok(());
        }
        if slot.replaced {
            return Err(DependencyError::illegal_state(&self.name, "实例已被替换过一次"));
        }
        debug!("组件实例被替换: {} -> {}", self.name, replacement.type_info());
        slot.instance = Some(replacement);
        slot.replaced = true;
        Ok(())
    }

    /// `Creating -> Created`
    pub fn mark_created(&self) -> DependencyResult<Instance> {
        let mut slot = self.slot.write();
        if slot.state != ComponentState::Creating {
            return Err(DependencyError::illegal_state(
                &self.name,
                format!("无法从 {:?} 完成创建", slot.state),
            ));
        }
        let instance = slot
            .instance
            .clone()
            .ok_or_else(|| DependencyError::illegal_state(&self.name, "创建完成但没有实例"))?;
        slot.state = ComponentState::Created;
        Ok(instance)
    }

    /// 创建失败时回到 `Defined`，丢弃半成品
    pub fn abort_creation(&self) {
        let mut slot = self.slot.write();
        if slot.state == ComponentState::Creating {
            debug!("组件创建回滚: {}", self.name);
            *slot = DefinitionSlot::default();
        }
    }

    /// 丢弃已创建的实例回到 `Defined`
    ///
    /// 用于它拿到的早期引用所属的组件创建失败时。
    pub fn discard(&self) {
        let mut slot = self.slot.write();
        if slot.state == ComponentState::Created {
            debug!("组件实例被丢弃: {}", self.name);
            *slot = DefinitionSlot::default();
        }
    }

    /// 标记为已销毁（终态）
    pub fn mark_destroyed(&self) {
        let mut slot = self.slot.write();
        slot.state = ComponentState::Destroyed;
        slot.instance = None;
        slot.raw = None;
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type.name)
            .field("source", &self.source)
            .field("order", &self.order)
            .field("primary", &self.primary)
            .field("lazy", &self.lazy)
            .field("state", &self.state())
            .finish()
    }
}
