//! 方法拦截抽象
//!
//! 代理由每个被拦截的 trait 手写：代理持有 [`Intercepted<T>`]，每个方法都经由
//! [`Intercepted::call`] 把真实调用包进拦截链。

use infrastructure_common::{InvocationError, InvocationResult};
use std::any::Any;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// 经过拦截链传递的返回值
pub type ReturnValue = Box<dyn Any + Send>;

/// 一次方法调用
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    /// 被拦截组件的名称
    pub component: &'a str,
    /// 方法名
    pub method: &'static str,
    /// 调用参数
    pub args: &'a [&'a dyn Debug],
}

impl Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("component", &self.component)
            .field("method", &self.method)
            .field("args", &self.args)
            .finish()
    }
}

/// 调用处理器
///
/// 所有钩子都有直通的默认实现。
pub trait InvocationHandler: Send + Sync {
    /// 调用前执行，返回错误会直接终止调用
    fn before(&self, _invocation: &Invocation<'_>) -> InvocationResult<()> {
        Ok(())
    }

    /// 调用成功后执行，可以替换返回值
    fn after(&self, _invocation: &Invocation<'_>, result: ReturnValue) -> InvocationResult<ReturnValue> {
        Ok(result)
    }

    /// 调用失败时执行，可以返回一个值来吞掉错误
    fn error(&self, _invocation: &Invocation<'_>, error: InvocationError) -> InvocationResult<ReturnValue> {
        Err(error)
    }

    /// 无论成功失败都会执行
    fn finally(&self, _invocation: &Invocation<'_>) {}
}

/// 有序的拦截链
pub struct InterceptorChain {
    component: String,
    handlers: Vec<(String, Arc<dyn InvocationHandler>)>,
}

impl InterceptorChain {
    /// 创建拦截链，处理器按给定顺序由外向内包裹
    pub fn new(component: impl Into<String>, handlers: Vec<(String, Arc<dyn InvocationHandler>)>) -> Self {
        Self {
            component: component.into(),
            handlers,
        }
    }

    /// 被拦截组件的名称
    pub fn component(&self) -> &str {
        &self.component
    }

    /// 处理器名称
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// 通过拦截链执行调用
    pub fn invoke(
        &self,
        method: &'static str,
        args: &[&dyn Debug],
        target: &mut dyn FnMut() -> InvocationResult<ReturnValue>,
    ) -> InvocationResult<ReturnValue> {
        let invocation = Invocation {
            component: &self.component,
            method,
            args,
        };
        self.invoke_at(0, &invocation, target)
    }

    fn invoke_at(
        &self,
        index: usize,
        invocation: &Invocation<'_>,
        target: &mut dyn FnMut() -> InvocationResult<ReturnValue>,
    ) -> InvocationResult<ReturnValue> {
        let Some((_, handler)) = self.handlers.get(index) else {
            return target();
        };

        handler.before(invocation)?;
        let result = self
            .invoke_at(index + 1, invocation, target)
            .and_then(|value| handler.after(invocation, value))
            .or_else(|error| handler.error(invocation, error));
        handler.finally(invocation);
        result
    }
}

impl Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("component", &self.component)
            .field("handlers", &self.handler_names())
            .finish()
    }
}

/// 手写代理的辅助类型
pub struct Intercepted<T: ?Sized> {
    target: Arc<T>,
    chain: Arc<InterceptorChain>,
}

impl<T: ?Sized> Clone for Intercepted<T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            chain: Arc::clone(&self.chain),
        }
    }
}

impl<T: ?Sized + Send + Sync> Intercepted<T> {
    pub fn new(target: Arc<T>, chain: Arc<InterceptorChain>) -> Self {
        Self { target, chain }
    }

    /// 被代理的原始对象
    pub fn target(&self) -> &Arc<T> {
        &self.target
    }

    pub fn chain(&self) -> &Arc<InterceptorChain> {
        &self.chain
    }

    /// 经拦截链调用一个不会失败的方法
    pub fn call<R, F>(&self, method: &'static str, args: &[&dyn Debug], f: F) -> InvocationResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&T) -> R,
    {
        self.try_call(method, args, |target| Ok(f(target)))
    }

    /// 经拦截链调用一个可能失败的方法，失败会交给处理器的 `error` 钩子
    pub fn try_call<R, F>(&self, method: &'static str, args: &[&dyn Debug], f: F) -> InvocationResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&T) -> InvocationResult<R>,
    {
        let mut call = Some(f);
        let target = &self.target;
        let mut invoke = || -> InvocationResult<ReturnValue> {
            let f = call
                .take()
                .ok_or_else(|| InvocationError::failed(method, "目标方法被重复调用"))?;
            f(&**target).map(|value| Box::new(value) as ReturnValue)
        };

        let value = self.chain.invoke(method, args, &mut invoke)?;
        value
            .downcast::<R>()
            .map(|value| *value)
            .map_err(|_| InvocationError::ReturnTypeMismatch {
                method: method.to_string(),
                expected: std::any::type_name::<R>().to_string(),
            })
    }
}
