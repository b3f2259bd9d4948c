//! # 依赖注入具体实现
//!
//! 提供组件定义注册表、依赖图解析、生命周期管理、拦截引擎、事件总线以及容器本身。
//!
//! ```ignore
//! let container = ContainerBuilder::new(PropertyStore::from_env())
//!     .register(greeter_descriptor())
//!     .build()?;
//! let greeter = container.get_bean::<dyn Greeter>()?;
//! ```

pub mod container;
pub mod eventbus;
pub mod interception;
pub mod lifecycle;
pub mod registry;
pub mod resolver;

pub use container::{Container, ContainerBuilder, ContainerConfig};
pub use eventbus::{EventBus, EventBusConfig, EventSubscriberProcessor, ShutdownPolicy};
pub use interception::InterceptionEngine;
pub use lifecycle::{InjectionPhase, LifecycleManager};
pub use registry::DefinitionRegistry;
pub use resolver::{CreationPlan, GraphResolver};
