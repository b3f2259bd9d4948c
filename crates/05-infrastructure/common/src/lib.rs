//! # Infrastructure Common
//!
//! 这个 crate 提供了 Autumn 组件容器各层共享的基础类型。
//!
//! ## 核心内容
//!
//! - [`TypeInfo`] - 运行时类型标识（支持 trait object）
//! - [`Annotation`] - 以数据形式表达的注解模型，由扫描器在构建期产出
//! - [`Instance`] - 类型擦除的共享组件句柄，携带稳定的对象标识
//! - [`ComponentState`] - 组件定义的生命周期状态
//! - 错误类型体系：[`PropertyError`]、[`DefinitionError`]、[`DependencyError`]、
//!   [`InterceptionError`]、[`DispatchError`]、[`ContainerError`]
//!
//! ## 设计原则
//!
//! - 不依赖运行时反射：所有元数据在扫描阶段一次性产出
//! - 组件以 `Arc<T>` 共享，`T` 可以是具体类型也可以是 `dyn Trait`
//! - 启动期错误致命，运行期查找错误可恢复

pub mod component;
pub mod errors;
pub mod metadata;

pub use component::*;
pub use errors::*;
pub use metadata::*;
