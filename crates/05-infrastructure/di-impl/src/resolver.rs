//! 依赖图解析
//!
//! 构建期校验构造期依赖（构造器参数、工厂方法所属配置组件、工厂方法参数），
//! 检测无法解开的构造期循环，并给出预创建顺序。

use crate::registry::DefinitionRegistry;
use di_abstractions::ComponentDefinition;
use infrastructure_common::{DependencyError, DependencyResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// 创建计划
#[derive(Debug, Default)]
pub struct CreationPlan {
    /// 后处理器组件，最先创建
    pub post_processors: Vec<Arc<ComponentDefinition>>,
    /// 其余非延迟组件：配置组件在前，依赖先于使用者
    pub eager: Vec<Arc<ComponentDefinition>>,
}

impl CreationPlan {
    pub fn names(&self) -> Vec<&str> {
        self.post_processors
            .iter()
            .chain(self.eager.iter())
            .map(|definition| definition.name.as_str())
            .collect()
    }
}

/// 依赖图解析器
#[derive(Debug, Default)]
pub struct GraphResolver;

impl GraphResolver {
    pub fn new() -> Self {
        Self
    }

    /// 校验构造期依赖并生成创建计划
    pub fn plan(&self, registry: &DefinitionRegistry) -> DependencyResult<CreationPlan> {
        let edges = self.construction_edges(registry)?;

        let mut visited = HashSet::new();
        let mut path = Vec::new();
        for definition in registry.all_definitions() {
            self.dfs_check(definition, &edges, &mut visited, &mut path)?;
        }

        let mut ordered: Vec<_> = registry
            .all_definitions()
            .iter()
            .filter(|definition| !definition.lazy)
            .cloned()
            .collect();
        ordered.sort_by_key(|definition| {
            let group = if definition.is_post_processor() {
                0
            } else if definition.configuration {
                1
            } else {
                2
            };
            (group, definition.order, definition.index)
        });

        let mut plan = CreationPlan::default();
        let mut emitted = HashSet::new();
        for definition in ordered {
            let mut sequence = Vec::new();
            self.emit(&definition, &edges, &mut emitted, &mut sequence);
            for item in sequence {
                if item.is_post_processor() {
                    plan.post_processors.push(item);
                } else {
                    plan.eager.push(item);
                }
            }
        }

        debug!("创建计划: {:?}", plan.names());
        Ok(plan)
    }

    /// 每个定义的构造期依赖目标
    fn construction_edges(
        &self,
        registry: &DefinitionRegistry,
    ) -> DependencyResult<HashMap<String, Vec<Arc<ComponentDefinition>>>> {
        let mut edges = HashMap::new();
        for definition in registry.all_definitions() {
            let mut targets = Vec::new();
            if let Some(owner) = definition.factory_owner() {
                let owner = registry.find_by_name(owner).ok_or_else(|| DependencyError::MissingDependency {
                    component: definition.name.clone(),
                    dependency: owner.to_string(),
                })?;
                targets.push(owner);
            }
            for dependency in definition.construction_dependencies() {
                if let Some(target) = registry.resolve(&definition.name, dependency)? {
                    targets.push(target);
                }
            }
            edges.insert(definition.name.clone(), targets);
        }
        Ok(edges)
    }

    fn dfs_check(
        &self,
        current: &Arc<ComponentDefinition>,
        edges: &HashMap<String, Vec<Arc<ComponentDefinition>>>,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> DependencyResult<()> {
        if let Some(start) = path.iter().position(|name| name == &current.name) {
            let mut chain = path[start..].to_vec();
            chain.push(current.name.clone());
            return Err(DependencyError::UnresolvableCycle {
                chain: chain.join(" -> "),
            });
        }

        if visited.contains(&current.name) {
            return Ok(());
        }

        path.push(current.name.clone());
        if let Some(targets) = edges.get(&current.name) {
            for target in targets {
                self.dfs_check(target, edges, visited, path)?;
            }
        }
        path.pop();
        visited.insert(current.name.clone());

        Ok(())
    }

    /// 依赖优先的后序输出；延迟组件只在被依赖时按需创建，不进入计划
    fn emit(
        &self,
        current: &Arc<ComponentDefinition>,
        edges: &HashMap<String, Vec<Arc<ComponentDefinition>>>,
        emitted: &mut HashSet<String>,
        sequence: &mut Vec<Arc<ComponentDefinition>>,
    ) {
        if !emitted.insert(current.name.clone()) {
            return;
        }
        if let Some(targets) = edges.get(&current.name) {
            for target in targets {
                self.emit(target, edges, emitted, sequence);
            }
        }
        if !current.lazy {
            sequence.push(current.clone());
        }
    }
}
