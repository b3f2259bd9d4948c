//! # 基础设施组合层
//!
//! 负责把属性加载、日志初始化与组件容器组合成一个可运行的应用。
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::{ApplicationBuilder, LoggingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let application = ApplicationBuilder::new("demo")
//!         .config_dir("./config")
//!         .with_logging(LoggingConfig::development())
//!         .build()?;
//!
//!     println!("应用 {} 已启动", application.id());
//!     application.shutdown();
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod builder;

pub use application::{Application, ApplicationStatus};
pub use builder::{initialize_logging, ApplicationBuilder, LoggingConfig};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;

#[cfg(test)]
mod tests;
