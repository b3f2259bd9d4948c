//! 错误类型定义

use thiserror::Error;

/// 装箱的底层错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 属性解析错误类型
#[derive(Error, Debug)]
pub enum PropertyError {
    #[error("配置键不存在: {key}")]
    MissingKey { key: String },

    #[error("占位符表达式无效: {expression}")]
    InvalidExpression { expression: String },

    #[error("占位符循环引用: {key}, 解析链: {chain}")]
    CyclicPlaceholder { key: String, chain: String },

    #[error("不支持的类型转换: {type_name}")]
    UnsupportedConversion { type_name: String },

    #[error("配置类型转换失败: {key}={value} -> {type_name}, 原因: {reason}")]
    ConversionFailed {
        key: String,
        value: String,
        type_name: String,
        reason: String,
    },

    #[error("配置源加载失败: {origin}, 原因: {source}")]
    SourceLoadFailed { origin: String, source: BoxError },
}

impl PropertyError {
    /// 创建缺失键错误
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }

    /// 创建配置源加载错误
    pub fn source_load_failed(origin: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::SourceLoadFailed {
            origin: origin.into(),
            source: source.into(),
        }
    }
}

/// 组件定义错误类型
///
/// 启动期致命错误，容器构建整体中止
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("组件名称重复: {name} ({existing_type} 与 {new_type})")]
    DuplicateDefinition {
        name: String,
        existing_type: String,
        new_type: String,
    },

    #[error("生命周期方法不能带参数: {type_name}::{method} ({parameter_count} 个参数)")]
    InvalidLifecycleMethod {
        type_name: String,
        method: String,
        parameter_count: usize,
    },

    #[error("类型 {type_name} 上存在多个 @{marker} 方法")]
    MultipleLifecycleMethods { type_name: String, marker: String },

    #[error("生命周期方法不存在: {type_name}::{method}")]
    LifecycleMethodNotFound { type_name: String, method: String },

    #[error("类型 {type_name} 上存在冲突的 @{marker} 标记: {names:?}")]
    DuplicateMarker {
        type_name: String,
        marker: String,
        names: Vec<String>,
    },

    #[error("组件缺少构造器描述: {type_name}")]
    MissingConstructor { type_name: String },

    #[error("注解无效: {type_name}, 原因: {message}")]
    InvalidAnnotation { type_name: String, message: String },
}

/// 依赖解析错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("组件 {component} 缺少必需依赖: {dependency}")]
    MissingDependency { component: String, dependency: String },

    #[error("组件 {component} 的依赖 {dependency} 存在多个候选且没有首选: {candidates:?}")]
    AmbiguousDependency {
        component: String,
        dependency: String,
        candidates: Vec<String>,
    },

    #[error("无法解析的构造期循环依赖: {chain}")]
    UnresolvableCycle { chain: String },

    #[error("未找到类型为 {type_name} 的组件")]
    NotFound { type_name: String },

    #[error("未找到名称为 {name} 的组件")]
    NotFoundByName { name: String },

    #[error("类型 {type_name} 存在多个候选且没有首选: {candidates:?}")]
    Ambiguous {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("组件 {name} 不能作为 {expected} 使用")]
    TypeMismatch { name: String, expected: String },

    #[error("组件创建失败: {name}, 原因: {source}")]
    CreationFailed { name: String, source: BoxError },

    #[error("组件状态非法: {name}, {message}")]
    IllegalState { name: String, message: String },

    #[error("容器已关闭")]
    ContainerClosed,
}

impl DependencyError {
    /// 创建组件创建失败错误
    pub fn creation_failed(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::CreationFailed {
            name: name.into(),
            source: source.into(),
        }
    }

    /// 创建状态非法错误
    pub fn illegal_state(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IllegalState {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// 拦截配置错误类型
///
/// 在所属组件创建时致命
#[derive(Error, Debug)]
pub enum InterceptionError {
    #[error("组件 {component} 的拦截处理器不存在: {handler}")]
    HandlerNotFound { component: String, handler: String },

    #[error("组件 {component} 的拦截处理器 {handler} 未实现 InvocationHandler")]
    InvalidHandler { component: String, handler: String },

    #[error("组件 {component} 的类型 {type_name} 没有可用的代理工厂")]
    ProxyUnavailable { component: String, type_name: String },

    #[error("组件 {component} 的代理工厂无法处理类型 {type_name}")]
    ProxyTypeMismatch { component: String, type_name: String },
}

/// 拦截链调用错误类型
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("方法调用失败: {method}, 原因: {source}")]
    Failed { method: String, source: BoxError },

    #[error("调用被处理器 {handler} 拒绝: {message}")]
    Rejected { handler: String, message: String },

    #[error("方法 {method} 的返回值类型不是 {expected}")]
    ReturnTypeMismatch { method: String, expected: String },
}

impl InvocationError {
    /// 包装目标方法的失败
    pub fn failed(method: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Failed {
            method: method.into(),
            source: source.into(),
        }
    }

    /// 创建处理器拒绝错误
    pub fn rejected(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

/// 事件分发错误类型
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("事件处理失败: {subscriber}::{operation}, 原因: {source}")]
    HandlerFailed {
        subscriber: String,
        operation: String,
        source: BoxError,
    },

    #[error("事件总线已关闭")]
    Closed,

    #[error("事件线程池不可用: {message}")]
    PoolUnavailable { message: String },
}

/// 容器错误类型
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("组件定义错误: {source}")]
    Definition {
        #[from]
        source: DefinitionError,
    },

    #[error("依赖注入错误: {source}")]
    Dependency {
        #[from]
        source: DependencyError,
    },

    #[error("拦截配置错误: {source}")]
    Interception {
        #[from]
        source: InterceptionError,
    },

    #[error("属性错误: {source}")]
    Property {
        #[from]
        source: PropertyError,
    },

    #[error("事件分发错误: {source}")]
    Dispatch {
        #[from]
        source: DispatchError,
    },
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("容器错误: {source}")]
    Container {
        #[from]
        source: ContainerError,
    },

    #[error("配置错误: {source}")]
    Property {
        #[from]
        source: PropertyError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type PropertyResult<T> = Result<T, PropertyError>;
pub type DefinitionResult<T> = Result<T, DefinitionError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type InvocationResult<T> = Result<T, InvocationError>;
pub type DispatchResult<T> = Result<T, DispatchError>;
pub type ContainerResult<T> = Result<T, ContainerError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_error_from_dependency_error() {
        let error: ContainerError = DependencyError::UnresolvableCycle {
            chain: "a -> b -> a".to_string(),
        }
        .into();

        assert!(matches!(
            error,
            ContainerError::Dependency {
                source: DependencyError::UnresolvableCycle { .. }
            }
        ));
        assert!(error.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_invocation_error_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let error = InvocationError::failed("hello", io);

        assert!(error.to_string().contains("hello"));
        assert!(error.to_string().contains("boom"));
    }
}
