//! 组件定义注册表

use di_abstractions::annotations::BeanAttributes;
use di_abstractions::{
    ComponentDefinition, CreationSource, DefinitionParts, DependencyKind, DependencySpec, Exposure,
    FactoryMethodDescriptor, FieldInjection, InterceptionBinding, LifecycleHook, OperationDescriptor,
    TypeDescriptor, DEFAULT_ORDER,
};
use infrastructure_common::{
    find_direct_marker, markers, Annotation, DefinitionError, DefinitionResult, DependencyError,
    DependencyResult, Instance, TypeInfo,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// 组件定义注册表
///
/// 构建期单线程写入，之后只读。
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: Vec<Arc<ComponentDefinition>>,
    by_name: HashMap<String, Arc<ComponentDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个候选类型
    ///
    /// 非组件类型返回空列表；配置组件的每个 `@Bean` 工厂方法额外产出一个定义。
    pub fn register(&mut self, descriptor: TypeDescriptor) -> DefinitionResult<Vec<Arc<ComponentDefinition>>> {
        let Some(name) = component_name(&descriptor)? else {
            debug!("跳过非组件类型: {}", descriptor.type_info);
            return Ok(Vec::new());
        };

        let configuration = find_direct_marker(&descriptor.annotations, markers::CONFIGURATION).is_some();
        let mut parts = vec![self.component_parts(name.clone(), &descriptor, configuration)?];
        if configuration {
            for method in &descriptor.factory_methods {
                if let Some(bean) = find_direct_marker(&method.annotations, markers::BEAN) {
                    let offset = parts.len();
                    parts.push(self.factory_parts(&name, method, bean, offset)?);
                }
            }
        }

        let mut seen = BTreeSet::new();
        for part in &parts {
            if let Some(existing) = self.by_name.get(&part.name) {
                return Err(DefinitionError::DuplicateDefinition {
                    name: part.name.clone(),
                    existing_type: existing.declared_type.name.to_string(),
                    new_type: part.declared_type.name.to_string(),
                });
            }
            if !seen.insert(part.name.clone()) {
                return Err(DefinitionError::DuplicateDefinition {
                    name: part.name.clone(),
                    existing_type: descriptor.type_info.name.to_string(),
                    new_type: part.declared_type.name.to_string(),
                });
            }
        }

        Ok(parts.into_iter().map(|part| self.insert(part)).collect())
    }

    /// 注册预先构建的实例
    pub fn register_instance(
        &mut self,
        name: &str,
        instance: Instance,
        exposures: Vec<Exposure>,
        destroy_hook: Option<LifecycleHook>,
    ) -> DefinitionResult<Arc<ComponentDefinition>> {
        let declared_type = *instance.type_info();
        if let Some(existing) = self.by_name.get(name) {
            return Err(DefinitionError::DuplicateDefinition {
                name: name.to_string(),
                existing_type: existing.declared_type.name.to_string(),
                new_type: declared_type.name.to_string(),
            });
        }

        let mut exposures = exposures;
        if !exposures.iter().any(|e| e.type_info == declared_type) {
            exposures.insert(0, same_type_exposure(declared_type));
        }

        Ok(self.insert(DefinitionParts {
            name: name.to_string(),
            declared_type,
            index: self.definitions.len(),
            source: CreationSource::Supplied(instance),
            fields: Vec::new(),
            init_hook: None,
            destroy_hook,
            order: DEFAULT_ORDER,
            primary: false,
            lazy: false,
            configuration: false,
            interception: None,
            operations: Vec::new(),
            exposures,
            proxy: None,
            annotations: Vec::new(),
        }))
    }

    /// 全部定义，按注册顺序
    pub fn all_definitions(&self) -> &[Arc<ComponentDefinition>] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.by_name.get(name).cloned()
    }

    /// 暴露指定类型的全部定义，按 `(order, 注册顺序)` 排序
    pub fn find_by_type(&self, type_info: &TypeInfo) -> Vec<Arc<ComponentDefinition>> {
        let mut candidates: Vec<_> = self
            .definitions
            .iter()
            .filter(|definition| definition.exposes(type_info))
            .cloned()
            .collect();
        candidates.sort_by_key(|definition| (definition.order, definition.index));
        candidates
    }

    /// 按类型查找唯一候选；多个候选时取唯一的首选
    pub fn find_unique_by_type(&self, type_info: &TypeInfo) -> DependencyResult<Option<Arc<ComponentDefinition>>> {
        let candidates = self.find_by_type(type_info);
        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.into_iter().next()),
            _ => {
                let mut primaries = candidates.iter().filter(|definition| definition.primary);
                match (primaries.next(), primaries.next()) {
                    (Some(primary), None) => Ok(Some(primary.clone())),
                    _ => Err(DependencyError::Ambiguous {
                        type_name: type_info.name.to_string(),
                        candidates: candidates.iter().map(|d| d.name.clone()).collect(),
                    }),
                }
            }
        }
    }

    /// 为组件 `component` 解析一个组件依赖
    ///
    /// 指定名称时只按名称查找，否则按类型查找。配置值依赖返回 `None`。
    pub fn resolve(
        &self,
        component: &str,
        dependency: &DependencySpec,
    ) -> DependencyResult<Option<Arc<ComponentDefinition>>> {
        let DependencyKind::Component { name, required } = &dependency.kind else {
            return Ok(None);
        };

        let found = match name {
            Some(name) => match self.by_name.get(name) {
                Some(definition) if definition.exposes(&dependency.target) => Some(definition.clone()),
                Some(_) => {
                    return Err(DependencyError::TypeMismatch {
                        name: name.clone(),
                        expected: dependency.target.name.to_string(),
                    })
                }
                None => None,
            },
            None => self
                .find_unique_by_type(&dependency.target)
                .map_err(|error| match error {
                    DependencyError::Ambiguous { candidates, .. } => DependencyError::AmbiguousDependency {
                        component: component.to_string(),
                        dependency: dependency.describe(),
                        candidates,
                    },
                    other => other,
                })?,
        };

        match found {
            Some(definition) => {
                debug!("解析依赖: {} -> {}", dependency.describe(), definition.name);
                Ok(Some(definition))
            }
            None if *required => Err(DependencyError::MissingDependency {
                component: component.to_string(),
                dependency: dependency.describe(),
            }),
            None => Ok(None),
        }
    }

    fn insert(&mut self, parts: DefinitionParts) -> Arc<ComponentDefinition> {
        let definition = Arc::new(ComponentDefinition::from(parts));
        info!(
            "注册组件定义: {} ({})",
            definition.name, definition.declared_type
        );
        self.by_name.insert(definition.name.clone(), definition.clone());
        self.definitions.push(definition.clone());
        definition
    }

    fn component_parts(
        &self,
        name: String,
        descriptor: &TypeDescriptor,
        configuration: bool,
    ) -> DefinitionResult<DefinitionParts> {
        let type_name = descriptor.type_info.name;
        let constructor = descriptor
            .constructor
            .as_ref()
            .ok_or_else(|| DefinitionError::MissingConstructor {
                type_name: type_name.to_string(),
            })?;

        let annotations = &descriptor.annotations;
        Ok(DefinitionParts {
            name,
            declared_type: descriptor.type_info,
            index: self.definitions.len(),
            source: CreationSource::Constructor {
                dependencies: constructor.params.iter().map(DependencySpec::from_point).collect(),
                construct: constructor.construct.clone(),
            },
            fields: field_injections(descriptor),
            init_hook: marked_hook(descriptor, markers::POST_CONSTRUCT)?,
            destroy_hook: marked_hook(descriptor, markers::PRE_DESTROY)?,
            order: order_of(type_name, annotations)?,
            primary: find_direct_marker(annotations, markers::PRIMARY).is_some(),
            lazy: find_direct_marker(annotations, markers::LAZY).is_some(),
            configuration,
            interception: interception_of(type_name, annotations)?,
            operations: descriptor.operations.clone(),
            exposures: descriptor.exposures.clone(),
            proxy: descriptor.proxy.clone(),
            annotations: annotations.clone(),
        })
    }

    fn factory_parts(
        &self,
        owner: &str,
        method: &FactoryMethodDescriptor,
        bean: &Annotation,
        offset: usize,
    ) -> DefinitionResult<DefinitionParts> {
        let product = &method.product;
        let type_name = product.type_info.name;
        let name = bean
            .non_empty_str_attribute(markers::VALUE_ATTRIBUTE)
            .unwrap_or(method.name.as_str())
            .to_string();

        // 方法上的注解优先，产品类型上的注解补充
        let annotations: Vec<Annotation> = method
            .annotations
            .iter()
            .chain(product.annotations.iter())
            .cloned()
            .collect();

        let init_hook = match bean.non_empty_str_attribute(BeanAttributes::INIT_METHOD) {
            Some(method_name) => Some(named_hook(product, method_name)?),
            None => marked_hook(product, markers::POST_CONSTRUCT)?,
        };
        let destroy_hook = match bean.non_empty_str_attribute(BeanAttributes::DESTROY_METHOD) {
            Some(method_name) => Some(named_hook(product, method_name)?),
            None => marked_hook(product, markers::PRE_DESTROY)?,
        };

        Ok(DefinitionParts {
            name,
            declared_type: product.type_info,
            index: self.definitions.len() + offset,
            source: CreationSource::FactoryMethod {
                owner: owner.to_string(),
                method: method.name.clone(),
                dependencies: method.params.iter().map(DependencySpec::from_point).collect(),
                invoke: method.invoke.clone(),
            },
            fields: field_injections(product),
            init_hook,
            destroy_hook,
            order: order_of(type_name, &annotations)?,
            primary: find_direct_marker(&annotations, markers::PRIMARY).is_some(),
            lazy: find_direct_marker(&annotations, markers::LAZY).is_some(),
            configuration: false,
            interception: interception_of(type_name, &annotations)?,
            operations: product.operations.clone(),
            exposures: product.exposures.clone(),
            proxy: product.proxy.clone(),
            annotations,
        })
    }
}

/// 推导组件名称，非组件类型返回 `None`
fn component_name(descriptor: &TypeDescriptor) -> DefinitionResult<Option<String>> {
    let paths: Vec<Option<String>> = descriptor
        .annotations
        .iter()
        .flat_map(component_paths)
        .collect();
    if paths.is_empty() {
        return Ok(None);
    }

    let explicit: BTreeSet<String> = paths.into_iter().flatten().collect();
    if explicit.len() > 1 {
        return Err(DefinitionError::DuplicateMarker {
            type_name: descriptor.type_info.name.to_string(),
            marker: markers::COMPONENT.to_string(),
            names: explicit.into_iter().collect(),
        });
    }

    Ok(Some(
        explicit
            .into_iter()
            .next()
            .unwrap_or_else(|| descriptor.type_info.default_component_name()),
    ))
}

/// 递归查找通往 `@Component` 的标注路径，每条路径给出其显式名称
fn component_paths(annotation: &Annotation) -> Vec<Option<String>> {
    if annotation.is_core_library() {
        return Vec::new();
    }

    let own_name = annotation
        .non_empty_str_attribute(markers::VALUE_ATTRIBUTE)
        .map(str::to_string);
    if annotation.is_marker(markers::COMPONENT) {
        return vec![own_name];
    }

    annotation
        .meta
        .iter()
        .flat_map(component_paths)
        .map(|inner| own_name.clone().or(inner))
        .collect()
}

fn field_injections(descriptor: &TypeDescriptor) -> Vec<FieldInjection> {
    descriptor
        .fields
        .iter()
        .map(|field| FieldInjection {
            dependency: DependencySpec::from_point(&field.point),
            inject: field.inject.clone(),
        })
        .collect()
}

fn marked_hook(descriptor: &TypeDescriptor, marker: &str) -> DefinitionResult<Option<LifecycleHook>> {
    let mut marked = descriptor
        .operations
        .iter()
        .filter(|operation| operation.marker(marker).is_some());
    let Some(operation) = marked.next() else {
        return Ok(None);
    };
    if marked.next().is_some() {
        return Err(DefinitionError::MultipleLifecycleMethods {
            type_name: descriptor.type_info.name.to_string(),
            marker: marker.to_string(),
        });
    }
    hook_from(descriptor, operation).map(Some)
}

fn named_hook(descriptor: &TypeDescriptor, method: &str) -> DefinitionResult<LifecycleHook> {
    let operation = descriptor
        .operation(method)
        .ok_or_else(|| DefinitionError::LifecycleMethodNotFound {
            type_name: descriptor.type_info.name.to_string(),
            method: method.to_string(),
        })?;
    hook_from(descriptor, operation)
}

fn hook_from(descriptor: &TypeDescriptor, operation: &OperationDescriptor) -> DefinitionResult<LifecycleHook> {
    if !operation.params.is_empty() {
        return Err(DefinitionError::InvalidLifecycleMethod {
            type_name: descriptor.type_info.name.to_string(),
            method: operation.name.clone(),
            parameter_count: operation.params.len(),
        });
    }
    Ok(LifecycleHook::from_operation(operation))
}

fn order_of(type_name: &str, annotations: &[Annotation]) -> DefinitionResult<i32> {
    let Some(order) = find_direct_marker(annotations, markers::ORDER) else {
        return Ok(DEFAULT_ORDER);
    };
    let value = order
        .int_attribute(markers::VALUE_ATTRIBUTE)
        .ok_or_else(|| DefinitionError::InvalidAnnotation {
            type_name: type_name.to_string(),
            message: "@Order 缺少 value".to_string(),
        })?;
    i32::try_from(value).map_err(|_| DefinitionError::InvalidAnnotation {
        type_name: type_name.to_string(),
        message: format!("@Order 的值超出范围: {}", value),
    })
}

fn interception_of(type_name: &str, annotations: &[Annotation]) -> DefinitionResult<Option<InterceptionBinding>> {
    let Some(around) = find_direct_marker(annotations, markers::AROUND) else {
        return Ok(None);
    };
    let handlers = around.list_attribute(markers::VALUE_ATTRIBUTE);
    if handlers.is_empty() || handlers.iter().any(|h| h.is_empty()) {
        return Err(DefinitionError::InvalidAnnotation {
            type_name: type_name.to_string(),
            message: "@Around 必须列出至少一个处理器名称".to_string(),
        });
    }
    Ok(Some(InterceptionBinding { handlers }))
}

/// 以实例自身类型暴露
fn same_type_exposure(type_info: TypeInfo) -> Exposure {
    Exposure {
        type_info,
        view: Arc::new(move |instance: &Instance| (instance.type_info() == &type_info).then(|| instance.clone())),
    }
}
