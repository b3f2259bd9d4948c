//! 类型描述符
//!
//! 扫描器对每个候选类型产出一份 [`TypeDescriptor`]：注解、构造器、字段注入点、
//! 可调用的操作、工厂方法以及类型可以暴露的视图（如 `dyn Greeter`）。
//! 所有带类型的操作在构建描述符时被擦除为闭包，容器在运行期不需要反射。

use crate::annotations;
use crate::interception::InterceptorChain;
use anyhow::{anyhow, bail};
use infrastructure_common::{find_direct_marker, Annotation, Instance, TypeInfo};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 构造函数
pub type ConstructFn = Arc<dyn Fn(&Arguments) -> anyhow::Result<Instance> + Send + Sync>;
/// 工厂方法：在所属配置组件上调用，产出新组件
pub type FactoryFn = Arc<dyn Fn(&Instance, &Arguments) -> anyhow::Result<Instance> + Send + Sync>;
/// 字段注入函数
pub type FieldInjectFn = Arc<dyn Fn(&Instance, Injected) -> anyhow::Result<()> + Send + Sync>;
/// 操作调用函数
pub type InvokeFn =
    Arc<dyn Fn(&Instance, &[&(dyn Any + Send + Sync)]) -> anyhow::Result<()> + Send + Sync>;
/// 视图转换函数，实例类型不符时返回 `None`
pub type ViewFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;
/// 代理工厂函数，实例类型不符时返回 `None`
pub type ProxyFn = Arc<dyn Fn(&Instance, Arc<InterceptorChain>) -> Option<Instance> + Send + Sync>;

fn downcast_target<T: Send + Sync + 'static>(instance: &Instance) -> anyhow::Result<Arc<T>> {
    instance.downcast::<T>().ok_or_else(|| {
        anyhow!(
            "实例类型不匹配: 期望 {}, 实际 {}",
            std::any::type_name::<T>(),
            instance.type_info().name
        )
    })
}

/// 注入点（构造器参数、工厂方法参数或字段）
#[derive(Debug, Clone)]
pub struct InjectionPoint {
    /// 参数或字段名
    pub name: String,
    /// 需要注入的类型
    pub type_info: TypeInfo,
    /// 注入点上的注解
    pub annotations: Vec<Annotation>,
}

impl InjectionPoint {
    /// 按类型自动装配的必需依赖
    pub fn of<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_info: TypeInfo::of::<T>(),
            annotations: Vec::new(),
        }
    }

    /// 按名称装配的依赖
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>, component: &str) -> Self {
        Self::of::<T>(name).with_annotation(annotations::autowired(Some(component), true))
    }

    /// 可选依赖，找不到时注入为空
    pub fn optional<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::of::<T>(name).with_annotation(annotations::autowired(None, false))
    }

    /// 配置值注入
    pub fn value<V: 'static>(name: impl Into<String>, expression: &str) -> Self {
        Self::of::<V>(name).with_annotation(annotations::value(expression))
    }

    /// 添加注解
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// 解析后的注入值
pub enum Injected {
    /// 组件实例（已转换为注入点要求的视图）
    Component(Instance),
    /// 转换后的配置值
    Value(Box<dyn Any + Send + Sync>),
    /// 可选依赖不存在
    Absent,
}

impl fmt::Debug for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Injected::Component(instance) => f.debug_tuple("Component").field(instance).finish(),
            Injected::Value(_) => f.write_str("Value(..)"),
            Injected::Absent => f.write_str("Absent"),
        }
    }
}

/// 构造器与工厂方法的实参
#[derive(Debug)]
pub struct Arguments {
    owner: String,
    values: Vec<Injected>,
}

impl Arguments {
    pub fn new(owner: impl Into<String>, values: Vec<Injected>) -> Self {
        Self {
            owner: owner.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 获取第 `index` 个组件参数
    pub fn component<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> anyhow::Result<Arc<T>> {
        self.optional_component(index)?.ok_or_else(|| {
            anyhow!("{} 的第 {} 个参数缺少组件 {}", self.owner, index, std::any::type_name::<T>())
        })
    }

    /// 获取第 `index` 个可选组件参数
    pub fn optional_component<T: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> anyhow::Result<Option<Arc<T>>> {
        match self.values.get(index) {
            Some(Injected::Component(instance)) => instance.downcast::<T>().map(Some).ok_or_else(|| {
                anyhow!(
                    "{} 的第 {} 个参数类型不匹配: 期望 {}, 实际 {}",
                    self.owner,
                    index,
                    std::any::type_name::<T>(),
                    instance.type_info().name
                )
            }),
            Some(Injected::Absent) => Ok(None),
            Some(Injected::Value(_)) => bail!("{} 的第 {} 个参数是配置值而不是组件", self.owner, index),
            None => bail!("{} 只有 {} 个参数", self.owner, self.values.len()),
        }
    }

    /// 获取第 `index` 个配置值参数
    pub fn value<V: Clone + 'static>(&self, index: usize) -> anyhow::Result<V> {
        match self.values.get(index) {
            Some(Injected::Value(value)) => value.downcast_ref::<V>().cloned().ok_or_else(|| {
                anyhow!(
                    "{} 的第 {} 个参数不是 {}",
                    self.owner,
                    index,
                    std::any::type_name::<V>()
                )
            }),
            Some(_) => bail!("{} 的第 {} 个参数不是配置值", self.owner, index),
            None => bail!("{} 只有 {} 个参数", self.owner, self.values.len()),
        }
    }
}

/// 构造器描述
#[derive(Clone)]
pub struct ConstructorDescriptor {
    pub params: Vec<InjectionPoint>,
    pub construct: ConstructFn,
}

/// 字段注入描述
#[derive(Clone)]
pub struct FieldDescriptor {
    pub point: InjectionPoint,
    pub inject: FieldInjectFn,
}

/// 可调用操作描述
///
/// 用于生命周期钩子与事件处理方法。
#[derive(Clone)]
pub struct OperationDescriptor {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub params: Vec<TypeInfo>,
    pub invoker: InvokeFn,
}

impl OperationDescriptor {
    pub fn new(
        name: impl Into<String>,
        annotations: Vec<Annotation>,
        params: Vec<TypeInfo>,
        invoker: InvokeFn,
    ) -> Self {
        Self {
            name: name.into(),
            annotations,
            params,
            invoker,
        }
    }

    /// 无参操作
    pub fn nullary<T, F>(name: impl Into<String>, annotations: Vec<Annotation>, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let invoker: InvokeFn = Arc::new(move |instance: &Instance, _args: &[&(dyn Any + Send + Sync)]| {
            let target = downcast_target::<T>(instance)?;
            f(&target)
        });
        Self::new(name, annotations, Vec::new(), invoker)
    }

    /// 单参数操作
    pub fn unary<T, E, F>(name: impl Into<String>, annotations: Vec<Annotation>, f: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: Fn(&T, &E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let invoker: InvokeFn = Arc::new(move |instance: &Instance, args: &[&(dyn Any + Send + Sync)]| {
            let target = downcast_target::<T>(instance)?;
            let argument = args
                .first()
                .and_then(|arg| arg.downcast_ref::<E>())
                .ok_or_else(|| anyhow!("参数类型不匹配: 期望 {}", std::any::type_name::<E>()))?;
            f(&target, argument)
        });
        Self::new(name, annotations, vec![TypeInfo::of::<E>()], invoker)
    }

    /// 调用操作
    pub fn invoke(&self, instance: &Instance, args: &[&(dyn Any + Send + Sync)]) -> anyhow::Result<()> {
        (self.invoker)(instance, args)
    }

    /// 查找直接标注的容器标记
    pub fn marker(&self, name: &str) -> Option<&Annotation> {
        find_direct_marker(&self.annotations, name)
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// 可暴露的视图
#[derive(Clone)]
pub struct Exposure {
    pub type_info: TypeInfo,
    pub view: ViewFn,
}

impl Exposure {
    /// 类型自身
    pub fn identity<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            view: Arc::new(|instance: &Instance| instance.is::<T>().then(|| instance.clone())),
        }
    }

    /// 从实例得到该视图；实例本身已是该类型（例如代理）时直接返回
    pub fn view_of(&self, instance: &Instance) -> Option<Instance> {
        if instance.type_info() == &self.type_info {
            return Some(instance.clone());
        }
        (self.view)(instance)
    }
}

impl fmt::Debug for Exposure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_info.name)
    }
}

/// 代理描述
#[derive(Clone)]
pub struct ProxyDescriptor {
    /// 代理暴露的类型
    pub type_info: TypeInfo,
    pub factory: ProxyFn,
}

impl fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("type", &self.type_info.name)
            .finish()
    }
}

/// 工厂方法描述
#[derive(Clone)]
pub struct FactoryMethodDescriptor {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub params: Vec<InjectionPoint>,
    pub invoke: FactoryFn,
    /// 产品的描述（操作、视图、注解）
    pub product: Box<TypeDescriptor>,
}

/// 类型描述符
#[derive(Clone)]
pub struct TypeDescriptor {
    pub type_info: TypeInfo,
    pub annotations: Vec<Annotation>,
    pub constructor: Option<ConstructorDescriptor>,
    pub fields: Vec<FieldDescriptor>,
    pub operations: Vec<OperationDescriptor>,
    pub factory_methods: Vec<FactoryMethodDescriptor>,
    /// 第一个视图总是类型自身
    pub exposures: Vec<Exposure>,
    pub proxy: Option<ProxyDescriptor>,
}

impl TypeDescriptor {
    /// 开始描述类型 `T`
    pub fn builder<T: Send + Sync + 'static>() -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder::new()
    }

    /// 按名称查找操作
    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// 是否暴露指定类型
    pub fn exposes(&self, type_info: &TypeInfo) -> bool {
        self.exposures.iter().any(|e| &e.type_info == type_info)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type", &self.type_info.name)
            .field("annotations", &self.annotations)
            .field("operations", &self.operations)
            .field("exposures", &self.exposures)
            .field("factory_methods", &self.factory_methods.len())
            .finish()
    }
}

/// 带类型的描述符构建器
pub struct TypeDescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> TypeDescriptorBuilder<T> {
    pub fn new() -> Self {
        Self {
            descriptor: TypeDescriptor {
                type_info: TypeInfo::of::<T>(),
                annotations: Vec::new(),
                constructor: None,
                fields: Vec::new(),
                operations: Vec::new(),
                factory_methods: Vec::new(),
                exposures: vec![Exposure::identity::<T>()],
                proxy: None,
            },
            _marker: PhantomData,
        }
    }

    /// 添加类型注解
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.descriptor.annotations.push(annotation);
        self
    }

    /// 设置构造器
    pub fn constructor<F>(mut self, params: Vec<InjectionPoint>, f: F) -> Self
    where
        F: Fn(&Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let construct: ConstructFn =
            Arc::new(move |args: &Arguments| f(args).map(|value| Instance::new(Arc::new(value))));
        self.descriptor.constructor = Some(ConstructorDescriptor { params, construct });
        self
    }

    /// 字段注入组件；没有注解时按类型装配必需依赖
    pub fn field<D, F>(mut self, name: &str, annotations: Vec<Annotation>, setter: F) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<D>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let point = InjectionPoint {
            name: name.to_string(),
            type_info: TypeInfo::of::<D>(),
            annotations,
        };
        let field = point.name.clone();
        let inject: FieldInjectFn = Arc::new(move |instance: &Instance, injected: Injected| match injected {
            Injected::Component(dependency) => {
                let target = downcast_target::<T>(instance)?;
                let dependency = dependency
                    .downcast::<D>()
                    .ok_or_else(|| anyhow!("字段 {} 的注入类型不匹配", field))?;
                setter(&target, dependency)
            }
            Injected::Absent => Ok(()),
            Injected::Value(_) => bail!("字段 {} 需要组件而不是配置值", field),
        });
        self.descriptor.fields.push(FieldDescriptor { point, inject });
        self
    }

    /// 字段注入配置值
    pub fn value_field<V, F>(mut self, name: &str, expression: &str, setter: F) -> Self
    where
        V: Send + Sync + 'static,
        F: Fn(&T, V) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let point = InjectionPoint::value::<V>(name, expression);
        let field = point.name.clone();
        let inject: FieldInjectFn = Arc::new(move |instance: &Instance, injected: Injected| match injected {
            Injected::Value(value) => {
                let target = downcast_target::<T>(instance)?;
                let value = value
                    .downcast::<V>()
                    .map_err(|_| anyhow!("字段 {} 的配置值类型不匹配", field))?;
                setter(&target, *value)
            }
            _ => bail!("字段 {} 需要配置值", field),
        });
        self.descriptor.fields.push(FieldDescriptor { point, inject });
        self
    }

    /// 添加无参操作
    pub fn operation<F>(mut self, name: &str, annotations: Vec<Annotation>, f: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.descriptor
            .operations
            .push(OperationDescriptor::nullary::<T, F>(name, annotations, f));
        self
    }

    /// 添加单参数操作（例如事件处理方法）
    pub fn handler<E, F>(mut self, name: &str, annotations: Vec<Annotation>, f: F) -> Self
    where
        E: Send + Sync + 'static,
        F: Fn(&T, &E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.descriptor
            .operations
            .push(OperationDescriptor::unary::<T, E, F>(name, annotations, f));
        self
    }

    /// 添加任意签名的操作
    pub fn raw_operation(mut self, operation: OperationDescriptor) -> Self {
        self.descriptor.operations.push(operation);
        self
    }

    /// 暴露额外视图
    pub fn expose<V, F>(mut self, f: F) -> Self
    where
        V: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<V> + Send + Sync + 'static,
    {
        let view: ViewFn = Arc::new(move |instance: &Instance| {
            instance.downcast::<T>().map(|target| Instance::new(f(target)))
        });
        self.descriptor.exposures.push(Exposure {
            type_info: TypeInfo::of::<V>(),
            view,
        });
        self
    }

    /// 设置代理工厂；`V` 应当同时通过 [`expose`](Self::expose) 暴露
    pub fn proxy<V, F>(mut self, f: F) -> Self
    where
        V: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>, Arc<InterceptorChain>) -> Arc<V> + Send + Sync + 'static,
    {
        let factory: ProxyFn = Arc::new(move |instance: &Instance, chain: Arc<InterceptorChain>| {
            instance
                .downcast::<T>()
                .map(|target| Instance::new(f(target, chain)))
        });
        self.descriptor.proxy = Some(ProxyDescriptor {
            type_info: TypeInfo::of::<V>(),
            factory,
        });
        self
    }

    /// 添加工厂方法
    pub fn factory_method<P, F>(
        mut self,
        name: &str,
        annotations: Vec<Annotation>,
        params: Vec<InjectionPoint>,
        f: F,
        product: TypeDescriptorBuilder<P>,
    ) -> Self
    where
        P: Send + Sync + 'static,
        F: Fn(&T, &Arguments) -> anyhow::Result<P> + Send + Sync + 'static,
    {
        let invoke: FactoryFn = Arc::new(move |owner: &Instance, args: &Arguments| {
            let target = downcast_target::<T>(owner)?;
            f(&target, args).map(|value| Instance::new(Arc::new(value)))
        });
        self.descriptor.factory_methods.push(FactoryMethodDescriptor {
            name: name.to_string(),
            annotations,
            params,
            invoke,
            product: Box::new(product.build()),
        });
        self
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

impl<T: Send + Sync + 'static> Default for TypeDescriptorBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autowired::Autowired;
    use once_cell::sync::OnceCell;

    trait Named: Send + Sync {
        fn name(&self) -> String;
    }

    #[derive(Default)]
    struct Repository {
        url: OnceCell<String>,
    }

    #[derive(Default)]
    struct Service {
        repository: Autowired<Repository>,
    }

    impl Named for Service {
        fn name(&self) -> String {
            "service".to_string()
        }
    }

    #[test]
    fn test_constructor_and_exposure() {
        let descriptor = TypeDescriptor::builder::<Service>()
            .constructor(Vec::new(), |_| Ok(Service::default()))
            .expose::<dyn Named, _>(|service| service)
            .build();

        let construct = &descriptor.constructor.as_ref().unwrap().construct;
        let instance = construct(&Arguments::new("service", Vec::new())).unwrap();
        assert!(descriptor.exposes(&TypeInfo::of::<dyn Named>()));

        let view = descriptor.exposures[1].view_of(&instance).unwrap();
        assert!(view.same_identity(&instance));
        assert_eq!(view.downcast::<dyn Named>().unwrap().name(), "service");
    }

    #[test]
    fn test_field_injection() {
        let descriptor = TypeDescriptor::builder::<Service>()
            .field::<Repository, _>("repository", Vec::new(), |service, repository| {
                service.repository.inject(repository)
            })
            .build();
        let service = Arc::new(Service::default());
        let instance = Instance::new(service.clone());
        let repository = Instance::new(Arc::new(Repository::default()));

        (descriptor.fields[0].inject)(&instance, Injected::Component(repository)).unwrap();
        assert!(service.repository.get().is_some());
    }

    #[test]
    fn test_value_field_injection() {
        let descriptor = TypeDescriptor::builder::<Repository>()
            .value_field::<String, _>("url", "${jdbc.url}", |repository, url| {
                repository.url.set(url).map_err(|_| anyhow!("url 已注入"))
            })
            .build();
        let repository = Arc::new(Repository::default());
        let instance = Instance::new(repository.clone());

        (descriptor.fields[0].inject)(&instance, Injected::Value(Box::new("jdbc:h2".to_string()))).unwrap();
        assert_eq!(repository.url.get().map(String::as_str), Some("jdbc:h2"));
        assert!(descriptor.fields[0].point.annotations[0].is_marker("Value"));
    }

    #[test]
    fn test_unary_operation_checks_argument_type() {
        let operation = OperationDescriptor::unary::<Repository, String, _>("on", Vec::new(), |repository, url| {
            repository.url.set(url.clone()).map_err(|_| anyhow!("重复"))
        });
        let instance = Instance::new(Arc::new(Repository::default()));

        assert!(operation.invoke(&instance, &[&42u32]).is_err());
        assert!(operation.invoke(&instance, &[&"jdbc".to_string()]).is_ok());
    }

    #[test]
    fn test_arguments_accessors() {
        let args = Arguments::new(
            "factory",
            vec![
                Injected::Component(Instance::new(Arc::new(Repository::default()))),
                Injected::Value(Box::new(20i32)),
                Injected::Absent,
            ],
        );

        assert!(args.component::<Repository>(0).is_ok());
        assert!(args.component::<Service>(0).is_err());
        assert_eq!(args.value::<i32>(1).unwrap(), 20);
        assert!(args.optional_component::<Repository>(2).unwrap().is_none());
        assert!(args.component::<Repository>(2).is_err());
    }
}
