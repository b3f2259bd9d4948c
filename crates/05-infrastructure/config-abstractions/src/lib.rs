//! # Configuration Abstractions
//!
//! 属性解析抽象层，定义属性读取、占位符表达式与类型转换的核心接口。
//!
//! ## 核心接口
//!
//! - [`PropertyResolver`] - 属性解析器接口
//! - [`PropertyResolverExt`] - 类型化读取扩展
//! - [`PropertyExpr`] - `${key}` / `${key:default}` 表达式
//! - [`FromPropertyValue`] - 字符串到目标类型的转换
//! - [`ConversionService`] - 运行时按类型分派的转换表
//! - [`PropertySource`] - 属性来源接口

pub mod conversion;
pub mod expr;
pub mod provider;
pub mod resolver;

pub use conversion::*;
pub use expr::*;
pub use provider::*;
pub use resolver::*;
