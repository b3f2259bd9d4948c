//! 事件总线
//!
//! 订阅者是带有 `@Subscribe` 操作的组件。同步处理器在发布者线程上依次执行，
//! 异步处理器提交到总线自有的阻塞线程池，失败只记录日志。

use di_abstractions::annotations::EventMode;
use di_abstractions::{ComponentDefinition, ComponentPostProcessor, CreationContext, OperationDescriptor};
use infrastructure_common::{
    markers, ContainerResult, DispatchError, DispatchResult, Instance, InstanceId, TypeInfo,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// 关闭时如何处理尚未完成的异步任务
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPolicy {
    /// 最多等待给定时间
    Drain(Duration),
    /// 立即释放线程池，不等待
    Abandon,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        ShutdownPolicy::Drain(Duration::from_secs(5))
    }
}

/// 事件总线配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBusConfig {
    /// 是否创建事件总线
    pub enabled: bool,
    /// 异步处理线程数上限
    pub worker_threads: usize,
    pub shutdown: ShutdownPolicy,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_threads: 16,
            shutdown: ShutdownPolicy::default(),
        }
    }
}

#[derive(Clone)]
struct EventHandler {
    event_type: TypeInfo,
    operation: OperationDescriptor,
    mode: EventMode,
}

struct Subscriber {
    sequence: u64,
    name: String,
    instance: Instance,
    handlers: Vec<EventHandler>,
}

/// 一次投递
struct Delivery {
    sequence: u64,
    subscriber: String,
    instance: Instance,
    handler: EventHandler,
}

/// 事件总线
pub struct EventBus {
    subscribers: DashMap<InstanceId, Subscriber>,
    sequence: AtomicU64,
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    tracker: TaskTracker,
    closed: AtomicBool,
    config: EventBusConfig,
}

impl EventBus {
    /// 组件名称
    pub const COMPONENT_NAME: &'static str = "eventBus";

    /// 创建事件总线及其线程池
    pub fn new(config: EventBusConfig) -> DispatchResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.worker_threads.max(1))
            .thread_name("autumn-event")
            .enable_all()
            .build()
            .map_err(|e| DispatchError::PoolUnavailable {
                message: e.to_string(),
            })?;
        let handle = runtime.handle().clone();

        info!(
            "事件总线已启动, 异步线程上限: {}, 关闭策略: {:?}",
            config.worker_threads, config.shutdown
        );
        Ok(Self {
            subscribers: DashMap::new(),
            sequence: AtomicU64::new(0),
            runtime: Mutex::new(Some(runtime)),
            handle,
            tracker: TaskTracker::new(),
            closed: AtomicBool::new(false),
            config,
        })
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// 注册订阅者，返回登记的处理方法数量
    ///
    /// 只登记带有 `@Subscribe` 且恰好有一个参数的操作；重复注册会替换之前的登记。
    pub fn register(&self, name: &str, instance: Instance, operations: &[OperationDescriptor]) -> usize {
        let mut handlers = Vec::new();
        for operation in operations {
            let Some(subscribe) = operation.marker(markers::SUBSCRIBE) else {
                continue;
            };
            match operation.params.as_slice() {
                [event_type] => handlers.push(EventHandler {
                    event_type: *event_type,
                    operation: operation.clone(),
                    mode: EventMode::from_annotation(subscribe),
                }),
                params => warn!(
                    "忽略事件处理方法 {}::{}: 需要恰好一个参数, 实际 {} 个",
                    name,
                    operation.name,
                    params.len()
                ),
            }
        }

        if handlers.is_empty() {
            return 0;
        }

        let count = handlers.len();
        let id = instance.id();
        let sequence = match self.subscribers.get(&id) {
            Some(existing) => existing.sequence,
            None => self.sequence.fetch_add(1, Ordering::SeqCst),
        };
        self.subscribers.insert(
            id,
            Subscriber {
                sequence,
                name: name.to_string(),
                instance,
                handlers,
            },
        );
        info!("注册事件订阅者: {}, 处理方法 {} 个", name, count);
        count
    }

    /// 移除订阅者的全部处理方法
    pub fn unregister(&self, instance: &Instance) -> bool {
        match self.subscribers.remove(&instance.id()) {
            Some((_, subscriber)) => {
                info!("移除事件订阅者: {}", subscriber.name);
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, instance: &Instance) -> bool {
        self.subscribers.contains_key(&instance.id())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// 尚未完成的异步任务数
    pub fn pending_tasks(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 发布事件，返回匹配到的处理方法数量
    ///
    /// 同步处理方法失败时中止剩余的同步投递并返回错误；已提交的异步任务不受影响。
    pub fn post<E>(&self, event: E) -> DispatchResult<usize>
    where
        E: Send + Sync + 'static,
    {
        if self.is_closed() {
            return Err(DispatchError::Closed);
        }

        let event_type = TypeInfo::of::<E>();
        let mut deliveries: Vec<Delivery> = self
            .subscribers
            .iter()
            .flat_map(|entry| {
                let subscriber = entry.value();
                subscriber
                    .handlers
                    .iter()
                    .filter(|handler| handler.event_type == event_type)
                    .map(|handler| Delivery {
                        sequence: subscriber.sequence,
                        subscriber: subscriber.name.clone(),
                        instance: subscriber.instance.clone(),
                        handler: handler.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        deliveries.sort_by_key(|delivery| delivery.sequence);

        if deliveries.is_empty() {
            debug!("事件没有订阅者: {}", event_type);
            return Ok(0);
        }

        let count = deliveries.len();
        let event = Arc::new(event);
        for delivery in deliveries {
            match delivery.handler.mode {
                EventMode::Sync => {
                    let argument: &(dyn Any + Send + Sync) = &*event;
                    delivery
                        .handler
                        .operation
                        .invoke(&delivery.instance, &[argument])
                        .map_err(|e| DispatchError::HandlerFailed {
                            subscriber: delivery.subscriber.clone(),
                            operation: delivery.handler.operation.name.clone(),
                            source: e.into(),
                        })?;
                }
                EventMode::Async => self.spawn(delivery, Arc::clone(&event)),
            }
        }
        Ok(count)
    }

    fn spawn<E>(&self, delivery: Delivery, event: Arc<E>)
    where
        E: Send + Sync + 'static,
    {
        self.tracker.spawn_blocking_on(
            move || {
                let argument: &(dyn Any + Send + Sync) = &*event;
                if let Err(e) = delivery.handler.operation.invoke(&delivery.instance, &[argument]) {
                    error!(
                        "异步事件处理失败: {}::{}, 原因: {:#}",
                        delivery.subscriber, delivery.handler.operation.name, e
                    );
                }
            },
            &self.handle,
        );
    }

    /// 关闭事件总线，可重复调用
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.tracker.close();
        self.subscribers.clear();

        let Some(runtime) = self.runtime.lock().take() else {
            return;
        };

        let inside_runtime = Handle::try_current().is_ok();
        match self.config.shutdown {
            ShutdownPolicy::Drain(timeout) if !inside_runtime => {
                let tracker = self.tracker.clone();
                let drained = runtime.block_on(async move { tokio::time::timeout(timeout, tracker.wait()).await });
                if drained.is_err() {
                    warn!(
                        "事件总线关闭超时, 仍有 {} 个异步任务未完成",
                        self.tracker.len()
                    );
                }
                runtime.shutdown_timeout(Duration::ZERO);
            }
            ShutdownPolicy::Drain(_) => {
                debug!("在异步运行时内关闭事件总线, 后台释放线程池");
                runtime.shutdown_background();
            }
            ShutdownPolicy::Abandon => runtime.shutdown_background(),
        }
        info!("事件总线已关闭");
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("pending_tasks", &self.tracker.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// 把带有 `@Subscribe` 操作的组件注册到事件总线
pub struct EventSubscriberProcessor {
    bus: Arc<EventBus>,
}

impl EventSubscriberProcessor {
    pub const NAME: &'static str = "eventSubscriberProcessor";

    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl ComponentPostProcessor for EventSubscriberProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn after_initialization(
        &self,
        instance: Instance,
        definition: &ComponentDefinition,
        _context: &dyn CreationContext,
    ) -> ContainerResult<Instance> {
        if definition.subscriber_operations().next().is_some() {
            let target = definition.raw_instance().unwrap_or_else(|| instance.clone());
            self.bus.register(&definition.name, target, &definition.operations);
        }
        Ok(instance)
    }
}
