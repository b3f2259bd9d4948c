//! 容器标记注解的构造函数
//!
//! 扫描器（或手写描述符）通过这些函数产出注解数据。

use infrastructure_common::{markers, Annotation};
use std::fmt;
use std::str::FromStr;

/// `@Component` / `@Component("name")`
pub fn component(name: Option<&str>) -> Annotation {
    named(markers::COMPONENT, name)
}

/// `@Configuration`，元注解为 `@Component`
pub fn configuration(name: Option<&str>) -> Annotation {
    named(markers::CONFIGURATION, name).with_meta(Annotation::marker(markers::COMPONENT))
}

/// `@Bean`
pub fn bean() -> Annotation {
    Annotation::marker(markers::BEAN)
}

/// `@Bean(value, initMethod, destroyMethod)`
pub fn bean_with(name: Option<&str>, init_method: Option<&str>, destroy_method: Option<&str>) -> Annotation {
    let mut annotation = named(markers::BEAN, name);
    if let Some(init) = init_method {
        annotation = annotation.with_attribute(BeanAttributes::INIT_METHOD, init);
    }
    if let Some(destroy) = destroy_method {
        annotation = annotation.with_attribute(BeanAttributes::DESTROY_METHOD, destroy);
    }
    annotation
}

/// `@Bean` 的属性名
pub struct BeanAttributes;

impl BeanAttributes {
    pub const INIT_METHOD: &'static str = "initMethod";
    pub const DESTROY_METHOD: &'static str = "destroyMethod";
}

/// `@Autowired(name, required)`
pub fn autowired(name: Option<&str>, required: bool) -> Annotation {
    let annotation =
        Annotation::marker(markers::AUTOWIRED).with_attribute(AutowiredAttributes::REQUIRED, required);
    match name {
        Some(name) => annotation.with_attribute(AutowiredAttributes::NAME, name),
        None => annotation,
    }
}

/// `@Autowired` 的属性名
pub struct AutowiredAttributes;

impl AutowiredAttributes {
    pub const NAME: &'static str = "name";
    pub const REQUIRED: &'static str = "required";
}

/// `@Value("${key}")`
pub fn value(expression: &str) -> Annotation {
    Annotation::marker(markers::VALUE).with_attribute(markers::VALUE_ATTRIBUTE, expression)
}

/// `@Primary`
pub fn primary() -> Annotation {
    Annotation::marker(markers::PRIMARY)
}

/// `@Order(value)`
pub fn order(value: i32) -> Annotation {
    Annotation::marker(markers::ORDER).with_attribute(markers::VALUE_ATTRIBUTE, i64::from(value))
}

/// `@Lazy`
pub fn lazy() -> Annotation {
    Annotation::marker(markers::LAZY)
}

/// `@Around("handlerA", "handlerB")`
pub fn around(handlers: &[&str]) -> Annotation {
    Annotation::marker(markers::AROUND).with_attribute(
        markers::VALUE_ATTRIBUTE,
        handlers.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
    )
}

/// `@PostConstruct`
pub fn post_construct() -> Annotation {
    Annotation::marker(markers::POST_CONSTRUCT)
}

/// `@PreDestroy`
pub fn pre_destroy() -> Annotation {
    Annotation::marker(markers::PRE_DESTROY)
}

/// `@Subscribe(mode)`
pub fn subscribe(mode: EventMode) -> Annotation {
    Annotation::marker(markers::SUBSCRIBE).with_attribute(markers::VALUE_ATTRIBUTE, mode.as_str())
}

fn named(marker: &str, name: Option<&str>) -> Annotation {
    let annotation = Annotation::marker(marker);
    match name {
        Some(name) => annotation.with_attribute(markers::VALUE_ATTRIBUTE, name),
        None => annotation,
    }
}

/// 事件投递模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventMode {
    /// 在发布者线程上同步执行
    #[default]
    Sync,
    /// 提交到线程池异步执行，失败互不影响
    Async,
}

impl EventMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventMode::Sync => "SYNC",
            EventMode::Async => "ASYNC",
        }
    }

    /// 读取 `@Subscribe` 注解上的模式，缺省为同步
    pub fn from_annotation(annotation: &Annotation) -> Self {
        annotation
            .str_attribute(markers::VALUE_ATTRIBUTE)
            .and_then(|mode| mode.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for EventMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SYNC" => Ok(EventMode::Sync),
            "ASYNC" => Ok(EventMode::Async),
            _ => Err(format!("未知的事件模式: {}", s)),
        }
    }
}

impl fmt::Display for EventMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
