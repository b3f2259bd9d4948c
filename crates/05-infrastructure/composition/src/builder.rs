//! 应用构建器

use crate::application::Application;
use config_impl::PropertyStore;
use di_abstractions::{ComponentPostProcessor, TypeDescriptor};
use di_impl::{ContainerBuilder, ContainerConfig};
use infrastructure_common::{InfrastructureError, InfrastructureResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// 应用构建器
///
/// 依次完成日志初始化、属性加载与容器构建。
pub struct ApplicationBuilder {
    /// 应用名称
    name: String,
    /// 配置目录
    config_dir: Option<PathBuf>,
    /// 额外的配置文件，按添加顺序覆盖
    config_files: Vec<PathBuf>,
    /// 代码中直接设置的属性，优先级最高
    overrides: Vec<(String, String)>,
    /// 是否读取进程环境变量
    include_env: bool,
    descriptors: Vec<TypeDescriptor>,
    post_processors: Vec<Arc<dyn ComponentPostProcessor>>,
    container_config: Option<ContainerConfig>,
    /// 日志配置，为空时不初始化日志
    logging: Option<LoggingConfig>,
}

impl ApplicationBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_dir: None,
            config_files: Vec::new(),
            overrides: Vec::new(),
            include_env: true,
            descriptors: Vec::new(),
            post_processors: Vec::new(),
            container_config: None,
            logging: None,
        }
    }

    /// 从目录加载 `__default-config__.yml` 与 `config.yml`
    pub fn config_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// 添加配置文件，文件必须存在
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_files.push(path.as_ref().to_path_buf());
        self
    }

    /// 直接设置属性
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// 是否以进程环境变量为属性底层
    pub fn include_env(mut self, enabled: bool) -> Self {
        self.include_env = enabled;
        self
    }

    /// 注册组件描述
    pub fn register(mut self, descriptor: TypeDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn register_all<I>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = TypeDescriptor>,
    {
        self.descriptors.extend(descriptors);
        self
    }

    pub fn with_post_processor(mut self, processor: Arc<dyn ComponentPostProcessor>) -> Self {
        self.post_processors.push(processor);
        self
    }

    /// 覆盖从属性读取的容器配置
    pub fn with_container_config(mut self, config: ContainerConfig) -> Self {
        self.container_config = Some(config);
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 加载属性
    ///
    /// 优先级从低到高: 环境变量, 配置目录, 配置文件, 直接设置的属性。
    pub fn load_properties(&self) -> InfrastructureResult<PropertyStore> {
        let mut store = match (&self.config_dir, self.include_env) {
            (Some(dir), true) => PropertyStore::load_from_dir(dir)?,
            (Some(dir), false) => {
                let mut store = PropertyStore::new();
                store
                    .load_optional_file(dir.join(config_impl::DEFAULT_CONFIG_FILE))?
                    .load_optional_file(dir.join(config_impl::CONFIG_FILE))?;
                store
            }
            (None, true) => PropertyStore::from_env(),
            (None, false) => PropertyStore::new(),
        };

        for file in &self.config_files {
            if !file.exists() {
                return Err(InfrastructureError::BootstrapFailed {
                    message: format!("配置文件不存在: {}", file.display()),
                });
            }
            debug!("加载配置文件: {}", file.display());
            store.load_file(file)?;
        }
        store.extend(self.overrides.iter().cloned());
        Ok(store)
    }

    /// 构建并启动应用
    pub fn build(self) -> InfrastructureResult<Application> {
        if let Some(logging) = &self.logging {
            initialize_logging(logging)?;
        }
        info!("开始构建应用: {}", self.name);

        let properties = self.load_properties()?;
        let mut container = ContainerBuilder::new(properties).register_all(self.descriptors);
        for processor in self.post_processors {
            container = container.with_post_processor(processor);
        }
        if let Some(config) = self.container_config {
            container = container.with_config(config);
        }

        let container = container.build()?;
        Ok(Application::new(self.name, container))
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 额外的过滤指令，如 `di_impl=debug`
    pub directives: Vec<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程名
    pub show_thread_names: bool,
    /// 是否显示文件名与行号
    pub show_location: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: Vec::new(),
            show_target: true,
            show_thread_names: false,
            show_location: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            directives: Vec::new(),
            show_target: true,
            show_thread_names: true,
            show_location: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: Vec::new(),
            show_target: false,
            show_thread_names: false,
            show_location: false,
            json_format: true,
        }
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// 组装过滤器；`RUST_LOG` 存在时优先
    pub fn env_filter(&self) -> InfrastructureResult<EnvFilter> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()));
        for directive in &self.directives {
            let directive = directive.parse().map_err(|e| InfrastructureError::BootstrapFailed {
                message: format!("日志过滤指令无效: {}, {}", directive, e),
            })?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }
}

/// 安装全局日志订阅者
///
/// 重复初始化会返回 `BootstrapFailed`。
pub fn initialize_logging(config: &LoggingConfig) -> InfrastructureResult<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter()?)
        .with_target(config.show_target)
        .with_thread_names(config.show_thread_names)
        .with_file(config.show_location)
        .with_line_number(config.show_location);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| InfrastructureError::BootstrapFailed {
        message: format!("日志初始化失败: {}", e),
    })?;

    info!("日志系统初始化完成");
    Ok(())
}
