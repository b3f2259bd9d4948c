//! 容器端到端集成测试
use anyhow::anyhow;
use config_impl::PropertyStore;
use di_abstractions::annotations::{
    around, bean_with, component, configuration, lazy, order, post_construct, pre_destroy, primary,
};
use di_abstractions::{
    Arguments, Autowired, ComponentContainer, ComponentDefinition, ComponentPostProcessor, CreationContext, InjectionPoint,
    Intercepted, InterceptorChain, Invocation, InvocationHandler, ReturnValue, TypeDescriptor,
};
use di_impl::{Container, ContainerBuilder};
use infrastructure_common::{
    ComponentState, ContainerError, ContainerResult, DefinitionError, DependencyError, Instance,
    InterceptionError, InvocationResult, PropertyError,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

fn builder() -> ContainerBuilder {
    init_logging();
    ContainerBuilder::new(PropertyStore::new())
}

trait Greeter: Send + Sync {
    fn hello(&self, name: &str) -> String;
}

#[derive(Debug)]
struct EnglishGreeter;

impl Greeter for EnglishGreeter {
    fn hello(&self, name: &str) -> String {
        format!("Hello, {}.", name)
    }
}

struct FrenchGreeter;

impl Greeter for FrenchGreeter {
    fn hello(&self, name: &str) -> String {
        format!("Bonjour, {}.", name)
    }
}

/// 手写的 `dyn Greeter` 代理
struct GreeterProxy(Intercepted<dyn Greeter>);

impl Greeter for GreeterProxy {
    fn hello(&self, name: &str) -> String {
        self.0
            .call("hello", &[&name], |target| target.hello(name))
            .unwrap_or_else(|e| e.to_string())
    }
}

fn greeter_proxy(target: Arc<dyn Greeter>, chain: Arc<InterceptorChain>) -> Arc<dyn Greeter> {
    Arc::new(GreeterProxy(Intercepted::new(target, chain)))
}

struct PoliteHandler;

impl InvocationHandler for PoliteHandler {
    fn after(&self, _invocation: &Invocation<'_>, result: ReturnValue) -> InvocationResult<ReturnValue> {
        match result.downcast::<String>() {
            Ok(text) => Ok(Box::new(text.replace('.', "!"))),
            Err(other) => Ok(other),
        }
    }
}

struct RecordingHandler {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl InvocationHandler for RecordingHandler {
    fn before(&self, invocation: &Invocation<'_>) -> InvocationResult<()> {
        self.log
            .lock()
            .push(format!("{}.before({})", self.name, invocation.method));
        Ok(())
    }

    fn finally(&self, _invocation: &Invocation<'_>) {
        self.log.lock().push(format!("{}.finally", self.name));
    }
}

fn polite_handler() -> TypeDescriptor {
    TypeDescriptor::builder::<PoliteHandler>()
        .annotate(component(None))
        .constructor(Vec::new(), |_| Ok(PoliteHandler))
        .expose::<dyn InvocationHandler, _>(|handler| handler)
        .build()
}

fn english_greeter(handlers: &[&str]) -> TypeDescriptor {
    let mut builder = TypeDescriptor::builder::<EnglishGreeter>()
        .annotate(component(None))
        .constructor(Vec::new(), |_| Ok(EnglishGreeter))
        .expose::<dyn Greeter, _>(|greeter| greeter)
        .proxy::<dyn Greeter, _>(|target, chain| greeter_proxy(target, chain));
    if !handlers.is_empty() {
        builder = builder.annotate(around(handlers));
    }
    builder.build()
}

fn french_greeter(extra: Vec<infrastructure_common::Annotation>) -> TypeDescriptor {
    let mut builder = TypeDescriptor::builder::<FrenchGreeter>()
        .annotate(component(None))
        .constructor(Vec::new(), |_| Ok(FrenchGreeter))
        .expose::<dyn Greeter, _>(|greeter| greeter);
    for annotation in extra {
        builder = builder.annotate(annotation);
    }
    builder.build()
}

/// 测试拦截代理替换返回值
#[test]
fn test_around_proxy_rewrites_greeting() {
    let container = builder()
        .register(english_greeter(&["politeHandler"]))
        .register(polite_handler())
        .build()
        .unwrap();

    let greeter = container.get_bean::<dyn Greeter>().unwrap();
    assert_eq!(greeter.hello("Bob"), "Hello, Bob!");

    // 代理之后只能以代理类型获取
    let concrete = container.get_bean_named::<EnglishGreeter>("englishGreeter");
    assert!(matches!(
        concrete,
        Err(ContainerError::Dependency {
            source: DependencyError::TypeMismatch { .. }
        })
    ));
}

/// 测试多个处理器的执行顺序
#[test]
fn test_handler_chain_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let recorder = |name: &'static str| {
        let log = log.clone();
        TypeDescriptor::builder::<RecordingHandler>()
            .annotate(component(Some(name)))
            .constructor(Vec::new(), move |_| Ok(RecordingHandler { name, log: log.clone() }))
            .expose::<dyn InvocationHandler, _>(|handler| handler)
            .build()
    };

    let container = builder()
        .register(english_greeter(&["outer", "inner"]))
        .register(recorder("outer"))
        .register(recorder("inner"))
        .build()
        .unwrap();

    container.get_bean::<dyn Greeter>().unwrap().hello("Ann");

    assert_eq!(
        *log.lock(),
        vec!["outer.before(hello)", "inner.before(hello)", "inner.finally", "outer.finally"]
    );
}

/// 测试拦截处理器不存在或类型不对
#[test]
fn test_interception_configuration_errors() {
    let missing = builder().register(english_greeter(&["nobody"])).build().unwrap_err();
    assert!(matches!(
        missing,
        ContainerError::Interception {
            source: InterceptionError::HandlerNotFound { .. }
        }
    ));

    let invalid = builder()
        .register(english_greeter(&["frenchGreeter"]))
        .register(french_greeter(Vec::new()))
        .build()
        .unwrap_err();
    assert!(matches!(
        invalid,
        ContainerError::Interception {
            source: InterceptionError::InvalidHandler { .. }
        }
    ));

    let unavailable = builder()
        .register(french_greeter(vec![around(&["politeHandler"])]))
        .register(polite_handler())
        .build()
        .unwrap_err();
    assert!(matches!(
        unavailable,
        ContainerError::Interception {
            source: InterceptionError::ProxyUnavailable { .. }
        }
    ));
}

/// 测试首选组件与歧义
#[test]
fn test_primary_and_ambiguous_lookup() {
    let ambiguous = builder()
        .register(english_greeter(&[]))
        .register(french_greeter(Vec::new()))
        .build()
        .unwrap();
    assert!(matches!(
        ambiguous.get_bean::<dyn Greeter>(),
        Err(ContainerError::Dependency {
            source: DependencyError::Ambiguous { .. }
        })
    ));
    assert_eq!(ambiguous.get_beans::<dyn Greeter>().unwrap().len(), 2);

    let with_primary = builder()
        .register(english_greeter(&[]))
        .register(french_greeter(vec![primary()]))
        .build()
        .unwrap();
    assert_eq!(
        with_primary.get_bean::<dyn Greeter>().unwrap().hello("Luc"),
        "Bonjour, Luc."
    );
}

/// 测试按 order 排列的多组件查询
#[test]
fn test_get_beans_ordered() {
    let container = builder()
        .register(english_greeter(&[]))
        .register(french_greeter(vec![order(-1)]))
        .build()
        .unwrap();

    let names: Vec<String> = container
        .get_beans::<dyn Greeter>()
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["frenchGreeter", "englishGreeter"]);
}

/// 测试未找到组件
#[test]
fn test_lookup_not_found() {
    let container = builder().build().unwrap();

    assert!(matches!(
        container.get_bean::<dyn Greeter>(),
        Err(ContainerError::Dependency {
            source: DependencyError::NotFound { .. }
        })
    ));
    assert!(container.get_bean_by_name("missing").unwrap().is_none());
}

#[derive(Default)]
struct OrderService {
    payments: Autowired<PaymentService>,
}

#[derive(Default)]
struct PaymentService {
    orders: Autowired<OrderService>,
}

/// 测试字段循环依赖通过早期引用解开
#[test]
fn test_field_cycle_is_resolved() {
    let container = builder()
        .register(
            TypeDescriptor::builder::<OrderService>()
                .annotate(component(None))
                .constructor(Vec::new(), |_| Ok(OrderService::default()))
                .field::<PaymentService, _>("payments", Vec::new(), |orders, payments| {
                    orders.payments.inject(payments)
                })
                .build(),
        )
        .register(
            TypeDescriptor::builder::<PaymentService>()
                .annotate(component(None))
                .constructor(Vec::new(), |_| Ok(PaymentService::default()))
                .field::<OrderService, _>("orders", Vec::new(), |payments, orders| {
                    payments.orders.inject(orders)
                })
                .build(),
        )
        .build()
        .unwrap();

    let orders = container.get_bean::<OrderService>().unwrap();
    let payments = container.get_bean::<PaymentService>().unwrap();
    assert!(Arc::ptr_eq(orders.payments.get().unwrap(), &payments));
    assert!(Arc::ptr_eq(payments.orders.get().unwrap(), &orders));
}

#[derive(Default)]
struct ConsoleGreeter {
    audience: Autowired<Audience>,
}

impl Greeter for ConsoleGreeter {
    fn hello(&self, name: &str) -> String {
        format!("Hello, {}.", name)
    }
}

#[derive(Default)]
struct Audience {
    greeter: Autowired<dyn Greeter>,
}

/// 测试被代理组件处在字段循环中：对方拿到原始对象，查找得到代理
#[test]
fn test_field_cycle_with_proxied_component() {
    let container = builder()
        .register(
            TypeDescriptor::builder::<ConsoleGreeter>()
                .annotate(component(None))
                .annotate(around(&["politeHandler"]))
                .constructor(Vec::new(), |_| Ok(ConsoleGreeter::default()))
                .field::<Audience, _>("audience", Vec::new(), |greeter, audience| {
                    greeter.audience.inject(audience)
                })
                .expose::<dyn Greeter, _>(|greeter| greeter)
                .proxy::<dyn Greeter, _>(|target, chain| greeter_proxy(target, chain))
                .build(),
        )
        .register(
            TypeDescriptor::builder::<Audience>()
                .annotate(component(None))
                .constructor(Vec::new(), |_| Ok(Audience::default()))
                .field::<dyn Greeter, _>("greeter", Vec::new(), |audience, greeter| {
                    audience.greeter.inject(greeter)
                })
                .build(),
        )
        .register(polite_handler())
        .build()
        .unwrap();

    let proxy = container.get_bean::<dyn Greeter>().unwrap();
    let audience = container.get_bean::<Audience>().unwrap();
    let early = audience.greeter.get().unwrap();

    assert_eq!(proxy.hello("Bob"), "Hello, Bob!");
    assert_eq!(early.hello("Bob"), "Hello, Bob.");

    let raw = container
        .definition("consoleGreeter")
        .and_then(|definition| definition.raw_instance())
        .unwrap();
    assert!(Instance::new(early.clone()).same_identity(&raw));
    assert!(!Instance::new(proxy.clone()).same_identity(&raw));
    assert!(Arc::ptr_eq(
        raw.downcast::<ConsoleGreeter>().unwrap().audience.get().unwrap(),
        &audience
    ));
}

#[derive(Default)]
struct Inventory {
    warehouse: Autowired<Warehouse>,
}

#[derive(Default)]
struct Warehouse {
    inventory: Autowired<Inventory>,
}

/// 测试字段循环中一方初始化失败时，持有其早期引用的另一方也被回滚
#[test]
fn test_failed_init_in_field_cycle_rolls_back_peer() {
    let fail_init = Arc::new(AtomicBool::new(true));
    let fail = fail_init.clone();
    let container = builder()
        .register(
            TypeDescriptor::builder::<Inventory>()
                .annotate(component(None))
                .annotate(lazy())
                .constructor(Vec::new(), |_| Ok(Inventory::default()))
                .field::<Warehouse, _>("warehouse", Vec::new(), |inventory, warehouse| {
                    inventory.warehouse.inject(warehouse)
                })
                .operation("load", vec![post_construct()], move |_| {
                    if fail.load(Ordering::SeqCst) {
                        return Err(anyhow!("库存加载失败"));
                    }
                    Ok(())
                })
                .build(),
        )
        .register(
            TypeDescriptor::builder::<Warehouse>()
                .annotate(component(None))
                .annotate(lazy())
                .constructor(Vec::new(), |_| Ok(Warehouse::default()))
                .field::<Inventory, _>("inventory", Vec::new(), |warehouse, inventory| {
                    warehouse.inventory.inject(inventory)
                })
                .build(),
        )
        .build()
        .unwrap();

    assert!(container.get_bean::<Inventory>().is_err());

    let state = |name: &str| container.definition(name).map(|definition| definition.state());
    assert_eq!(state("inventory"), Some(ComponentState::Defined));
    assert_eq!(state("warehouse"), Some(ComponentState::Defined));
    assert!(!container.creation_order().contains(&"warehouse".to_string()));

    fail_init.store(false, Ordering::SeqCst);
    let inventory = container.get_bean::<Inventory>().unwrap();
    let warehouse = container.get_bean::<Warehouse>().unwrap();
    assert!(Arc::ptr_eq(inventory.warehouse.get().unwrap(), &warehouse));
    assert!(Arc::ptr_eq(warehouse.inventory.get().unwrap(), &inventory));
}

struct Engine;
struct Wheel;

/// 测试构造期循环依赖被拒绝，且两个组件都不会被创建
#[test]
fn test_constructor_cycle_is_rejected() {
    let recorder = Arc::new(CountingProcessor {
        seen: Mutex::new(Vec::new()),
    });
    let error = builder()
        .with_post_processor(recorder.clone())
        .register(
            TypeDescriptor::builder::<Engine>()
                .annotate(component(None))
                .constructor(vec![InjectionPoint::of::<Wheel>("wheel")], |_| Ok(Engine))
                .build(),
        )
        .register(
            TypeDescriptor::builder::<Wheel>()
                .annotate(component(None))
                .constructor(vec![InjectionPoint::of::<Engine>("engine")], |_| Ok(Wheel))
                .build(),
        )
        .build()
        .unwrap_err();

    match error {
        ContainerError::Dependency {
            source: DependencyError::UnresolvableCycle { chain },
        } => assert_eq!(chain, "engine -> wheel -> engine"),
        other => panic!("unexpected error: {other}"),
    }
    let seen = recorder.seen.lock();
    assert!(!seen.contains(&"engine".to_string()));
    assert!(!seen.contains(&"wheel".to_string()));
}

/// 测试缺少必需依赖时构建失败
#[test]
fn test_missing_dependency_fails_build() {
    let error = builder()
        .register(
            TypeDescriptor::builder::<Engine>()
                .annotate(component(None))
                .constructor(vec![InjectionPoint::of::<Wheel>("wheel")], |_| Ok(Engine))
                .build(),
        )
        .build()
        .unwrap_err();

    assert!(matches!(
        error,
        ContainerError::Dependency {
            source: DependencyError::MissingDependency { .. }
        }
    ));
}

/// 测试重复的组件名称
#[test]
fn test_duplicate_definition_fails_build() {
    let error = builder()
        .register(french_greeter(Vec::new()))
        .register(french_greeter(Vec::new()))
        .build()
        .unwrap_err();

    assert!(matches!(
        error,
        ContainerError::Definition {
            source: DefinitionError::DuplicateDefinition { .. }
        }
    ));
}

struct Tracked;

fn tracked(name: &'static str, log: &Arc<Mutex<Vec<String>>>, fail_on_destroy: bool) -> TypeDescriptor {
    let init_log = log.clone();
    let destroy_log = log.clone();
    TypeDescriptor::builder::<Tracked>()
        .annotate(component(Some(name)))
        .constructor(Vec::new(), |_| Ok(Tracked))
        .operation("init", vec![post_construct()], move |_| {
            init_log.lock().push(format!("init:{}", name));
            Ok(())
        })
        .operation("destroy", vec![pre_destroy()], move |_| {
            destroy_log.lock().push(format!("destroy:{}", name));
            if fail_on_destroy {
                return Err(anyhow!("{} 关闭失败", name));
            }
            Ok(())
        })
        .build()
}

/// 测试销毁顺序与销毁失败
#[test]
fn test_destroy_in_reverse_creation_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = builder()
        .register(tracked("first", &log, false))
        .register(tracked("second", &log, true))
        .register(tracked("third", &log, false))
        .build()
        .unwrap();

    container.close();
    container.close();

    assert_eq!(
        *log.lock(),
        vec![
            "init:first",
            "init:second",
            "init:third",
            "destroy:third",
            "destroy:second",
            "destroy:first",
        ]
    );
    assert!(container
        .definitions()
        .iter()
        .all(|definition| definition.state() == infrastructure_common::ComponentState::Destroyed));
    assert!(matches!(
        container.get_bean::<Tracked>(),
        Err(ContainerError::Dependency {
            source: DependencyError::ContainerClosed
        })
    ));
}

struct Broken;

/// 测试构建失败时销毁已创建的组件
#[test]
fn test_failed_build_destroys_created_components() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let error = builder()
        .register(tracked("survivor", &log, false))
        .register(
            TypeDescriptor::builder::<Broken>()
                .annotate(component(None))
                .constructor(Vec::new(), |_| Err(anyhow!("无法连接")))
                .build(),
        )
        .build()
        .unwrap_err();

    assert!(error.to_string().contains("broken"));
    assert_eq!(*log.lock(), vec!["init:survivor", "destroy:survivor"]);
}

struct SystemClock;

struct AppConfig;

struct DataSource {
    url: String,
    pool_size: u32,
    clock: Arc<SystemClock>,
    opened: AtomicBool,
}

fn app_config() -> TypeDescriptor {
    TypeDescriptor::builder::<AppConfig>()
        .annotate(configuration(None))
        .constructor(Vec::new(), |_| Ok(AppConfig))
        .factory_method(
            "createDataSource",
            vec![bean_with(Some("dataSource"), Some("open"), None)],
            vec![
                InjectionPoint::value::<String>("url", "${db.url}"),
                InjectionPoint::value::<u32>("poolSize", "${db.pool-size:10}"),
                InjectionPoint::named::<SystemClock>("clock", "systemClock"),
            ],
            |_config: &AppConfig, args: &Arguments| {
                Ok(DataSource {
                    url: args.value(0)?,
                    pool_size: args.value(1)?,
                    clock: args.component(2)?,
                    opened: AtomicBool::new(false),
                })
            },
            TypeDescriptor::builder::<DataSource>().operation("open", Vec::new(), |source| {
                source.opened.store(true, Ordering::SeqCst);
                Ok(())
            }),
        )
        .build()
}

fn system_clock() -> TypeDescriptor {
    TypeDescriptor::builder::<SystemClock>()
        .annotate(component(Some("systemClock")))
        .constructor(Vec::new(), |_| Ok(SystemClock))
        .build()
}

/// 测试工厂方法的配置值参数与按名称装配参数
#[test]
fn test_factory_method_parameters() {
    init_logging();
    let properties = PropertyStore::from_map([("db.url", "jdbc:sqlite:${db.file:/tmp/app.db}")]);
    let container = ContainerBuilder::new(properties)
        .register(app_config())
        .register(system_clock())
        .build()
        .unwrap();

    let data_source = container.get_bean::<DataSource>().unwrap();
    assert_eq!(data_source.url, "jdbc:sqlite:/tmp/app.db");
    assert_eq!(data_source.pool_size, 10);
    assert!(data_source.opened.load(Ordering::SeqCst));
    assert!(Arc::ptr_eq(
        &data_source.clock,
        &container.get_bean::<SystemClock>().unwrap()
    ));

    let order = container.creation_order();
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(position("appConfig") < position("dataSource"));
    assert!(position("systemClock") < position("dataSource"));
}

/// 测试缺失的配置值
#[test]
fn test_missing_value_fails_build() {
    let error = builder()
        .register(app_config())
        .register(system_clock())
        .build()
        .unwrap_err();

    assert!(matches!(
        error,
        ContainerError::Property {
            source: PropertyError::MissingKey { .. }
        }
    ));
}

#[derive(Default)]
struct Banner {
    title: OnceCell<String>,
    width: OnceCell<usize>,
}

/// 测试字段上的占位符注入
#[test]
fn test_value_fields_with_nested_placeholders() {
    init_logging();
    let properties = PropertyStore::from_map([("fallback.title", "Autumn"), ("banner.width", "80")]);
    let container = ContainerBuilder::new(properties)
        .register(
            TypeDescriptor::builder::<Banner>()
                .annotate(component(None))
                .constructor(Vec::new(), |_| Ok(Banner::default()))
                .value_field::<String, _>("title", "${banner.title:${fallback.title}}", |banner, title| {
                    banner.title.set(title).map_err(|_| anyhow!("title 已注入"))
                })
                .value_field::<usize, _>("width", "${banner.width}", |banner, width| {
                    banner.width.set(width).map_err(|_| anyhow!("width 已注入"))
                })
                .build(),
        )
        .build()
        .unwrap();

    let banner = container.get_bean::<Banner>().unwrap();
    assert_eq!(banner.title.get().map(String::as_str), Some("Autumn"));
    assert_eq!(banner.width.get(), Some(&80));
}

struct Report;

/// 测试延迟组件在首次查询时创建
#[test]
fn test_lazy_component_created_on_first_lookup() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let container = builder()
        .register(
            TypeDescriptor::builder::<Report>()
                .annotate(component(None))
                .annotate(lazy())
                .constructor(Vec::new(), move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Report)
                })
                .build(),
        )
        .build()
        .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 0);

    let container = Arc::new(container);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let container = container.clone();
            std::thread::spawn(move || container.get_bean::<Report>().unwrap())
        })
        .collect();
    let reports: Vec<Arc<Report>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(reports.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

struct CountingProcessor {
    seen: Mutex<Vec<String>>,
}

impl ComponentPostProcessor for CountingProcessor {
    fn name(&self) -> &str {
        "countingProcessor"
    }

    fn after_initialization(
        &self,
        instance: Instance,
        definition: &ComponentDefinition,
        _context: &dyn CreationContext,
    ) -> ContainerResult<Instance> {
        self.seen.lock().push(definition.name.clone());
        Ok(instance)
    }
}

/// 测试后处理器组件先于其它组件创建
#[test]
fn test_post_processor_component() {
    let container = builder()
        .register(french_greeter(Vec::new()))
        .register(
            TypeDescriptor::builder::<CountingProcessor>()
                .annotate(component(None))
                .constructor(Vec::new(), |_| {
                    Ok(CountingProcessor {
                        seen: Mutex::new(Vec::new()),
                    })
                })
                .expose::<dyn ComponentPostProcessor, _>(|processor| processor)
                .build(),
        )
        .build()
        .unwrap();

    let processor = container.get_bean::<CountingProcessor>().unwrap();
    assert_eq!(container.creation_order()[0], "countingProcessor");
    assert!(processor.seen.lock().contains(&"frenchGreeter".to_string()));
    assert!(!processor.seen.lock().contains(&"countingProcessor".to_string()));
}

/// 测试预先构建的实例
#[test]
fn test_register_instance() {
    let greeter: Arc<dyn Greeter> = Arc::new(FrenchGreeter);
    let container = builder().register_instance("greeter", greeter.clone()).build().unwrap();

    let found = container.get_bean_named::<dyn Greeter>("greeter").unwrap();
    assert!(Arc::ptr_eq(&found, &greeter));
    assert!(container.contains_bean("greeter"));
}

/// 测试在异步运行时内关闭容器
#[tokio::test]
async fn test_close_inside_async_runtime() {
    let container: Container = builder().register(french_greeter(Vec::new())).build().unwrap();
    let bus = container.event_bus().cloned().unwrap();

    drop(container);

    assert!(bus.is_closed());
}
