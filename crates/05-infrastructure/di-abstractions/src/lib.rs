//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义组件描述、组件定义与容器扩展点。
//!
//! ## 核心接口
//!
//! - [`TypeDescriptor`] - 扫描器产出的类型描述（构造器、字段、操作、视图）
//! - [`ComponentDefinition`] - 注册后的组件定义及其状态
//! - [`ComponentPostProcessor`] - 初始化前后的扩展点
//! - [`InvocationHandler`] / [`InterceptorChain`] - 方法拦截
//! - [`ComponentContainer`] - 组件查找接口

pub mod annotations;
pub mod autowired;
pub mod container;
pub mod definition;
pub mod descriptor;
pub mod interception;
pub mod processor;

pub use annotations::EventMode;
pub use autowired::*;
pub use container::*;
pub use definition::*;
pub use descriptor::*;
pub use interception::*;
pub use processor::*;
