//! # Configuration Implementation
//!
//! 属性解析的具体实现，提供属性存储与各种属性来源。
//!
//! ## 主要组件
//!
//! - [`PropertyStore`] - 扁平属性存储，支持占位符解析
//! - [`FileSource`] - YAML / TOML / JSON 文件属性来源
//! - [`EnvironmentSource`] - 环境变量属性来源

pub mod providers;
pub mod store;

pub use providers::*;
pub use store::*;
