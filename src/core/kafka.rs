use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::overwrite::Override;
use crate::models::KafkaClusterConfig;
use crate::warn::WarningSink;

/// 一个作用域内的集群表和当前集群
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct KafkaScope {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub active_kafka: String,
    #[serde(default)]
    pub kafka_cluster_configs: BTreeMap<String, KafkaClusterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scope", rename_all = "snake_case")]
enum ClusterScope {
    Global(KafkaScope),
    Environment {
        #[serde(default)]
        environments: BTreeMap<String, KafkaScope>,
    },
}

/// 被覆盖前的当前集群，连同它所属的环境
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingActive {
    pub environment: String,
    pub cluster_id: String,
    /// 覆盖前该环境的作用域是否已存在；不存在的话换回原值时不能留下空作用域
    pub scope_existed: bool,
}

/// context 已知的 Kafka 集群。
/// 模式（全局 / 按环境）在构造时确定，之后不会改变；
/// 所有操作都带上环境 id，全局模式下忽略它。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KafkaClusterContext {
    #[serde(flatten)]
    scope: ClusterScope,
    #[serde(skip)]
    pending_active: Override<PendingActive>,
}

impl KafkaClusterContext {
    pub fn global() -> Self {
        Self {
            scope: ClusterScope::Global(KafkaScope::default()),
            pending_active: Override::Unset,
        }
    }

    pub fn environment_scoped() -> Self {
        Self {
            scope: ClusterScope::Environment {
                environments: BTreeMap::new(),
            },
            pending_active: Override::Unset,
        }
    }

    pub fn is_environment_scoped(&self) -> bool {
        matches!(self.scope, ClusterScope::Environment { .. })
    }

    fn scope(&self, environment: &str) -> Option<&KafkaScope> {
        match &self.scope {
            ClusterScope::Global(scope) => Some(scope),
            ClusterScope::Environment { environments } => environments.get(environment),
        }
    }

    /// 按环境模式下不存在的作用域会被创建
    fn scope_mut(&mut self, environment: &str) -> &mut KafkaScope {
        match &mut self.scope {
            ClusterScope::Global(scope) => scope,
            ClusterScope::Environment { environments } => {
                environments.entry(environment.to_string()).or_default()
            }
        }
    }

    fn scopes_mut(&mut self) -> Vec<(&str, &mut KafkaScope)> {
        match &mut self.scope {
            ClusterScope::Global(scope) => vec![("", scope)],
            ClusterScope::Environment { environments } => environments
                .iter_mut()
                .map(|(env, scope)| (env.as_str(), scope))
                .collect(),
        }
    }

    pub fn active_kafka_cluster_id(&self, environment: &str) -> &str {
        self.scope(environment)
            .map(|s| s.active_kafka.as_str())
            .unwrap_or("")
    }

    pub fn active_kafka_cluster_config(&self, environment: &str) -> Option<&KafkaClusterConfig> {
        let scope = self.scope(environment)?;
        scope.kafka_cluster_configs.get(&scope.active_kafka)
    }

    pub fn set_active_kafka_cluster(&mut self, environment: &str, cluster_id: &str) {
        self.scope_mut(environment).active_kafka = cluster_id.to_string();
    }

    pub fn kafka_cluster_config(
        &self,
        environment: &str,
        cluster_id: &str,
    ) -> Option<&KafkaClusterConfig> {
        self.scope(environment)?.kafka_cluster_configs.get(cluster_id)
    }

    pub fn kafka_cluster_config_mut(
        &mut self,
        environment: &str,
        cluster_id: &str,
    ) -> Option<&mut KafkaClusterConfig> {
        self.scope_mut(environment)
            .kafka_cluster_configs
            .get_mut(cluster_id)
    }

    pub fn add_kafka_cluster_config(&mut self, environment: &str, config: KafkaClusterConfig) {
        self.scope_mut(environment)
            .kafka_cluster_configs
            .insert(config.id.clone(), config);
    }

    /// 删除集群，如果它是当前集群则同时清空当前集群
    pub fn remove_kafka_cluster(
        &mut self,
        environment: &str,
        cluster_id: &str,
    ) -> Option<KafkaClusterConfig> {
        let scope = self.scope_mut(environment);
        let removed = scope.kafka_cluster_configs.remove(cluster_id);
        if scope.active_kafka == cluster_id {
            scope.active_kafka.clear();
        }
        removed
    }

    /// 从所有作用域的所有集群中删除 key，当前 key 等于它的一并清空
    pub fn delete_api_key(&mut self, key: &str) {
        for (_, scope) in self.scopes_mut() {
            for cluster in scope.kafka_cluster_configs.values_mut() {
                if let Some(keys) = cluster.api_keys.as_mut() {
                    keys.remove(key);
                }
                if cluster.api_key == key {
                    cluster.api_key.clear();
                }
            }
        }
    }

    /// 命令行覆盖当前集群：先记下原值（第一次生效），再切换
    pub fn override_active_kafka_cluster(&mut self, environment: &str, cluster_id: &str) {
        let original = self.active_kafka_cluster_id(environment).to_string();
        self.pending_active.capture(PendingActive {
            environment: environment.to_string(),
            cluster_id: original,
            scope_existed: self.scope(environment).is_some(),
        });
        self.set_active_kafka_cluster(environment, cluster_id);
    }

    pub fn pending_active(&self) -> Option<&PendingActive> {
        self.pending_active.get()
    }

    /// 把覆盖前的值换回去，返回被换下的覆盖值
    pub(crate) fn swap_in_original(&mut self) -> Option<PendingActive> {
        let pending = self.pending_active.get()?.clone();
        let scope = self.scope_mut(&pending.environment);
        let overridden = std::mem::replace(&mut scope.active_kafka, pending.cluster_id);
        if !pending.scope_existed {
            self.remove_empty_scope(&pending.environment);
        }
        Some(PendingActive {
            environment: pending.environment,
            cluster_id: overridden,
            scope_existed: pending.scope_existed,
        })
    }

    fn remove_empty_scope(&mut self, environment: &str) {
        if let ClusterScope::Environment { environments } = &mut self.scope {
            if environments
                .get(environment)
                .is_some_and(|scope| *scope == KafkaScope::default())
            {
                environments.remove(environment);
            }
        }
    }

    /// 显式设置当前集群后放弃本次命令的覆盖
    pub(crate) fn clear_pending_active(&mut self) {
        self.pending_active = Override::Unset;
    }

    pub(crate) fn restore_override(&mut self, swapped: PendingActive) {
        self.set_active_kafka_cluster(&swapped.environment, &swapped.cluster_id);
    }

    /// 自动修复无效引用和损坏的 key 表，返回是否有改动
    pub fn validate(&mut self, context_name: &str, sink: &dyn WarningSink) -> bool {
        let mut repaired = false;
        for (environment, scope) in self.scopes_mut() {
            for (cluster_id, cluster) in scope.kafka_cluster_configs.iter_mut() {
                repaired |= validate_cluster(context_name, cluster_id, cluster, sink);
            }

            if !scope.active_kafka.is_empty()
                && !scope.kafka_cluster_configs.contains_key(&scope.active_kafka)
            {
                let location = if environment.is_empty() {
                    format!("context \"{}\"", context_name)
                } else {
                    format!(
                        "environment \"{}\" of context \"{}\"",
                        environment, context_name
                    )
                };
                sink.warn(&format!(
                    "Warning: active Kafka cluster \"{}\" has no configuration stored for {}. \
                     Removing the active Kafka cluster setting; set it again with `kafka cluster use`.",
                    scope.active_kafka, location
                ));
                scope.active_kafka.clear();
                repaired = true;
            }
        }
        repaired
    }
}

fn validate_cluster(
    context_name: &str,
    cluster_id: &str,
    cluster: &mut KafkaClusterConfig,
    sink: &dyn WarningSink,
) -> bool {
    let mut repaired = false;
    if cluster.api_keys.is_none() {
        cluster.api_keys = Some(BTreeMap::new());
        repaired = true;
    }

    let keys = cluster.api_keys_mut();
    let mut missing_key = false;
    let mut mismatched_key = false;
    let mut missing_secret = false;
    keys.retain(|map_key, pair| {
        let empty = pair.key.is_empty();
        let mismatch = !empty && pair.key != *map_key;
        let no_secret = pair.secret.is_empty();
        missing_key |= empty;
        mismatched_key |= mismatch;
        missing_secret |= no_secret;
        !(empty || mismatch || no_secret)
    });

    if missing_key || mismatched_key || missing_secret {
        let mut problems = Vec::new();
        if missing_key {
            problems.push("API key missing");
        }
        if mismatched_key {
            problems.push("map key does not match the API key of the pair");
        }
        if missing_secret {
            problems.push("API secret missing");
        }
        sink.warn(&format!(
            "Warning: malformed API key entries for cluster \"{}\" in context \"{}\": {}. \
             Deleting the malformed entries; re-add them with `api-key store --resource {}`.",
            cluster_id,
            context_name,
            problems.join(", "),
            cluster_id
        ));
        repaired = true;
    }

    if !cluster.api_key.is_empty() && !cluster.has_api_key(&cluster.api_key) {
        sink.warn(&format!(
            "Warning: current API key \"{}\" of cluster \"{}\" in context \"{}\" is not stored. \
             Removing the current API key setting; re-add it with `api-key store --resource {}`.",
            cluster.api_key, cluster_id, context_name, cluster_id
        ));
        cluster.api_key.clear();
        repaired = true;
    }

    repaired
}
