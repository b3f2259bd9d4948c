//! 事件总线与容器的集成测试
use anyhow::anyhow;
use config_impl::PropertyStore;
use di_abstractions::annotations::{component, lazy, post_construct, subscribe};
use di_abstractions::{Autowired, ComponentContainer, EventMode, TypeDescriptor};
use di_impl::ContainerBuilder;
use infrastructure_common::{ContainerError, DispatchError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct OrderPlaced {
    id: u64,
}

#[derive(Default)]
struct Ledger {
    entries: Mutex<Vec<u64>>,
    audited: AtomicUsize,
}

fn ledger() -> TypeDescriptor {
    TypeDescriptor::builder::<Ledger>()
        .annotate(component(None))
        .constructor(Vec::new(), |_| Ok(Ledger::default()))
        .handler::<OrderPlaced, _>("record", vec![subscribe(EventMode::Sync)], |ledger, event| {
            ledger.entries.lock().push(event.id);
            Ok(())
        })
        .handler::<OrderPlaced, _>("audit", vec![subscribe(EventMode::Async)], |ledger, _| {
            ledger.audited.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build()
}

struct Gatekeeper;

fn gatekeeper() -> TypeDescriptor {
    TypeDescriptor::builder::<Gatekeeper>()
        .annotate(component(None))
        .constructor(Vec::new(), |_| Ok(Gatekeeper))
        .handler::<OrderPlaced, _>("check", vec![subscribe(EventMode::Sync)], |_, event| {
            if event.id == 0 {
                return Err(anyhow!("订单号无效"));
            }
            Ok(())
        })
        .build()
}

fn builder(entries: &[(&str, &str)]) -> ContainerBuilder {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
    ContainerBuilder::new(PropertyStore::from_map(entries.iter().copied()))
}

/// 测试订阅组件在创建后自动注册
#[test]
fn test_subscribers_registered_after_creation() {
    let container = builder(&[]).register(ledger()).build().unwrap();
    let bus = container.event_bus().cloned().unwrap();
    let ledger = container.get_bean::<Ledger>().unwrap();

    assert_eq!(bus.subscriber_count(), 1);
    assert_eq!(bus.post(OrderPlaced { id: 7 }).unwrap(), 2);
    assert_eq!(*ledger.entries.lock(), vec![7]);

    container.close();
    assert_eq!(ledger.audited.load(Ordering::SeqCst), 1);
    assert!(bus.is_closed());
}

/// 测试同步处理器失败会传给发布者
#[test]
fn test_sync_failure_reaches_publisher() {
    let container = builder(&[]).register(gatekeeper()).register(ledger()).build().unwrap();
    let bus = container.event_bus().cloned().unwrap();
    let ledger = container.get_bean::<Ledger>().unwrap();

    let error = bus.post(OrderPlaced { id: 0 }).unwrap_err();
    assert!(matches!(error, DispatchError::HandlerFailed { .. }));
    assert!(ledger.entries.lock().is_empty());

    bus.post(OrderPlaced { id: 1 }).unwrap();
    assert_eq!(*ledger.entries.lock(), vec![1]);
}

/// 测试注销订阅者
#[test]
fn test_unregister_component() {
    let container = builder(&[]).register(ledger()).build().unwrap();
    let bus = container.event_bus().cloned().unwrap();
    let raw = container.definition("ledger").and_then(|d| d.raw_instance()).unwrap();

    assert!(bus.unregister(&raw));
    assert!(!bus.unregister(&raw));
    assert_eq!(bus.post(OrderPlaced { id: 3 }).unwrap(), 0);
    assert!(container.get_bean::<Ledger>().unwrap().entries.lock().is_empty());
}

/// 测试关闭后发布事件
#[test]
fn test_post_after_close() {
    let container = builder(&[]).register(ledger()).build().unwrap();
    let bus = container.event_bus().cloned().unwrap();

    container.close();

    assert!(matches!(bus.post(OrderPlaced { id: 9 }), Err(DispatchError::Closed)));
    assert_eq!(bus.subscriber_count(), 0);
}

/// 测试通过配置关闭事件总线
#[test]
fn test_disabled_event_bus() {
    let container = builder(&[("autumn.event-bus.enabled", "false")])
        .register(ledger())
        .build()
        .unwrap();

    assert!(container.event_bus().is_none());
    assert!(!container.contains_bean("eventBus"));
    assert!(matches!(
        container.get_bean::<di_impl::EventBus>(),
        Err(ContainerError::Dependency { .. })
    ));
}

/// 测试事件总线本身可以按类型获取
#[test]
fn test_event_bus_lookup() {
    let container = builder(&[("autumn.event-bus.worker-threads", "2")])
        .build()
        .unwrap();

    let bus = container.get_bean::<di_impl::EventBus>().unwrap();
    assert_eq!(bus.config().worker_threads, 2);
    assert!(Arc::ptr_eq(&bus, container.event_bus().unwrap()));
}

#[derive(Default)]
struct Clerk {
    auditor: Autowired<Auditor>,
    entries: Mutex<Vec<u64>>,
}

#[derive(Default)]
struct Auditor {
    clerk: Autowired<Clerk>,
}

/// 测试回滚的组件从事件总线上移除
#[test]
fn test_rolled_back_subscriber_is_unregistered() {
    let container = builder(&[])
        .register(
            TypeDescriptor::builder::<Clerk>()
                .annotate(component(None))
                .annotate(lazy())
                .constructor(Vec::new(), |_| Ok(Clerk::default()))
                .field::<Auditor, _>("auditor", Vec::new(), |clerk, auditor| clerk.auditor.inject(auditor))
                .handler::<OrderPlaced, _>("record", vec![subscribe(EventMode::Sync)], |clerk, event| {
                    clerk.entries.lock().push(event.id);
                    Ok(())
                })
                .build(),
        )
        .register(
            TypeDescriptor::builder::<Auditor>()
                .annotate(component(None))
                .annotate(lazy())
                .constructor(Vec::new(), |_| Ok(Auditor::default()))
                .field::<Clerk, _>("clerk", Vec::new(), |auditor, clerk| auditor.clerk.inject(clerk))
                .operation("verify", vec![post_construct()], |_| Err(anyhow!("审计配置缺失")))
                .build(),
        )
        .build()
        .unwrap();
    let bus = container.event_bus().cloned().unwrap();

    assert!(container.get_bean::<Auditor>().is_err());
    assert_eq!(bus.subscriber_count(), 0);
    assert_eq!(bus.post(OrderPlaced { id: 4 }).unwrap(), 0);
}
