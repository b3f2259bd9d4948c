//! 运行中的应用

use chrono::{DateTime, Utc};
use di_impl::{Container, EventBus};
use std::fmt;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 应用运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    Running,
    Stopped,
}

/// 已启动的应用，持有容器
pub struct Application {
    id: Uuid,
    name: String,
    started_at: DateTime<Utc>,
    container: Arc<Container>,
}

impl Application {
    pub(crate) fn new(name: String, container: Container) -> Self {
        let application = Self {
            id: Uuid::new_v4(),
            name,
            started_at: Utc::now(),
            container: Arc::new(container),
        };
        info!(
            "应用已启动: {} (id: {}, 组件数: {})",
            application.name,
            application.id,
            application.container.definitions().len()
        );
        application
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// 已运行时长
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.container.event_bus()
    }

    pub fn status(&self) -> ApplicationStatus {
        if self.container.is_closed() {
            ApplicationStatus::Stopped
        } else {
            ApplicationStatus::Running
        }
    }

    /// 关闭容器，可重复调用
    pub fn shutdown(&self) {
        if self.container.is_closed() {
            return;
        }
        info!("正在关闭应用: {}, 运行时长 {}s", self.name, self.uptime().num_seconds());
        self.container.close();
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("started_at", &self.started_at)
            .field("status", &self.status())
            .finish()
    }
}
