use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::kafka::KafkaClusterContext;
use crate::core::overwrite::Override;
use crate::error::{ConfigError, Result};
use crate::models::{
    Account, ContextState, CredentialKind, KafkaClusterConfig, SchemaRegistryCluster,
};

/// 命名的 profile：绑定一个 platform、一个 credential、Kafka 集群表、
/// 按环境索引的 Schema Registry 集群，以及会话状态。
///
/// `state` 不在 context 里序列化，加载时按名字从 `context_states` 接回来；
/// `credential_kind` 同理从 credential 接回来。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Context {
    pub name: String,
    #[serde(rename = "platform")]
    pub platform_name: String,
    #[serde(rename = "credential")]
    pub credential_name: String,
    pub(crate) kafka_cluster_context: KafkaClusterContext,
    #[serde(default)]
    pub schema_registry_clusters: BTreeMap<String, SchemaRegistryCluster>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_org_id: String,
    #[serde(skip)]
    pub state: ContextState,
    #[serde(skip)]
    pub(crate) credential_kind: CredentialKind,
    #[serde(skip)]
    pending_account: Override<Option<Account>>,
}

impl Context {
    pub fn new(
        name: &str,
        platform_name: &str,
        credential_name: &str,
        credential_kind: CredentialKind,
        kafka_cluster_context: KafkaClusterContext,
        state: ContextState,
    ) -> Self {
        Self {
            name: name.to_string(),
            platform_name: platform_name.to_string(),
            credential_name: credential_name.to_string(),
            kafka_cluster_context,
            schema_registry_clusters: BTreeMap::new(),
            last_org_id: String::new(),
            state,
            credential_kind,
            pending_account: Override::Unset,
        }
    }

    /// 模式在构造时确定，只提供只读访问
    pub fn kafka_cluster_context(&self) -> &KafkaClusterContext {
        &self.kafka_cluster_context
    }

    pub fn credential_kind(&self) -> CredentialKind {
        self.credential_kind
    }

    /// 交互式登录有 token 即视为已登录；静态 key 永远不算登录
    pub fn has_login(&self) -> Result<bool> {
        match self.credential_kind {
            CredentialKind::InteractiveLogin => Ok(!self.state.auth_token.is_empty()),
            CredentialKind::StaticKeyPair => Ok(false),
            CredentialKind::None => Err(ConfigError::InvalidCredentialKind(self.name.clone())),
        }
    }

    pub fn auth_token(&self) -> &str {
        &self.state.auth_token
    }

    pub fn current_environment_id(&self) -> &str {
        self.state.account_id()
    }

    pub fn active_kafka_cluster_id(&self) -> &str {
        self.kafka_cluster_context
            .active_kafka_cluster_id(self.current_environment_id())
    }

    pub fn active_kafka_cluster_config(&self) -> Option<&KafkaClusterConfig> {
        self.kafka_cluster_context
            .active_kafka_cluster_config(self.current_environment_id())
    }

    pub fn set_active_kafka_cluster(&mut self, cluster_id: &str) {
        let environment = self.state.account_id().to_string();
        self.kafka_cluster_context
            .set_active_kafka_cluster(&environment, cluster_id);
    }

    pub fn kafka_cluster_config(&self, cluster_id: &str) -> Option<&KafkaClusterConfig> {
        self.kafka_cluster_context
            .kafka_cluster_config(self.current_environment_id(), cluster_id)
    }

    pub fn add_kafka_cluster_config(&mut self, config: KafkaClusterConfig) {
        let environment = self.state.account_id().to_string();
        self.kafka_cluster_context
            .add_kafka_cluster_config(&environment, config);
    }

    pub fn remove_kafka_cluster(&mut self, cluster_id: &str) -> Option<KafkaClusterConfig> {
        let environment = self.state.account_id().to_string();
        self.kafka_cluster_context
            .remove_kafka_cluster(&environment, cluster_id)
    }

    pub fn delete_api_key(&mut self, key: &str) {
        self.kafka_cluster_context.delete_api_key(key);
    }

    /// 命令行覆盖当前集群，原值记录在它所属的环境下
    pub fn override_active_kafka_cluster(&mut self, cluster_id: &str) {
        let environment = self.state.account_id().to_string();
        self.kafka_cluster_context
            .override_active_kafka_cluster(&environment, cluster_id);
    }

    pub fn schema_registry_cluster(&self, environment: &str) -> Option<&SchemaRegistryCluster> {
        self.schema_registry_clusters.get(environment)
    }

    pub fn find_schema_registry_cluster_by_id(&self, id: &str) -> Option<&SchemaRegistryCluster> {
        self.schema_registry_clusters.values().find(|c| c.id == id)
    }

    pub fn set_schema_registry_cluster(
        &mut self,
        environment: &str,
        cluster: SchemaRegistryCluster,
    ) {
        self.schema_registry_clusters
            .insert(environment.to_string(), cluster);
    }

    /// 切换当前环境。调用方负责同步顶层 context_states。
    pub(crate) fn set_account(&mut self, account: Option<Account>) {
        self.state.auth.get_or_insert_with(Default::default).account = account;
    }

    pub(crate) fn current_account(&self) -> Option<Account> {
        self.state.auth.as_ref().and_then(|a| a.account.clone())
    }

    /// 命令行覆盖当前环境：先记下原值（第一次生效），再切换
    pub(crate) fn override_account(&mut self, account: Account) {
        let original = self.current_account();
        self.pending_account.capture(original);
        self.set_account(Some(account));
    }

    pub(crate) fn swap_in_original_account(&mut self) -> Option<Option<Account>> {
        let original = self.pending_account.get()?.clone();
        let overridden = self.current_account();
        self.set_account(original);
        Some(overridden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthConfig;

    fn logged_in_state(token: &str, env: &str) -> ContextState {
        ContextState {
            auth: Some(AuthConfig {
                user: "user@example.com".into(),
                account: Some(Account {
                    id: env.into(),
                    name: env.into(),
                }),
                accounts: vec![Account {
                    id: env.into(),
                    name: env.into(),
                }],
                organization: String::new(),
            }),
            auth_token: token.into(),
        }
    }

    fn context(kind: CredentialKind, state: ContextState) -> Context {
        Context::new(
            "ctx",
            "platform",
            "cred",
            kind,
            KafkaClusterContext::environment_scoped(),
            state,
        )
    }

    #[test]
    fn test_has_login_interactive() {
        let ctx = context(CredentialKind::InteractiveLogin, logged_in_state("tok", "env-1"));
        assert!(ctx.has_login().unwrap());

        let ctx = context(CredentialKind::InteractiveLogin, logged_in_state("", "env-1"));
        assert!(!ctx.has_login().unwrap());
    }

    #[test]
    fn test_has_login_static_key_never() {
        let ctx = context(CredentialKind::StaticKeyPair, logged_in_state("tok", "env-1"));
        assert!(!ctx.has_login().unwrap());
    }

    #[test]
    fn test_has_login_unknown_kind() {
        let ctx = context(CredentialKind::None, ContextState::default());
        let err = ctx.has_login().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCredentialKind(_)));
    }

    #[test]
    fn test_current_environment_id() {
        let ctx = context(CredentialKind::InteractiveLogin, logged_in_state("tok", "env-1"));
        assert_eq!(ctx.current_environment_id(), "env-1");

        let ctx = context(CredentialKind::InteractiveLogin, ContextState::default());
        assert_eq!(ctx.current_environment_id(), "");
    }

    #[test]
    fn test_cluster_helpers_follow_current_environment() {
        let mut ctx = context(CredentialKind::InteractiveLogin, logged_in_state("tok", "env-1"));
        ctx.add_kafka_cluster_config(KafkaClusterConfig::new("lkc-1"));
        ctx.set_active_kafka_cluster("lkc-1");
        assert_eq!(ctx.active_kafka_cluster_id(), "lkc-1");

        ctx.set_account(Some(Account {
            id: "env-2".into(),
            name: "env-2".into(),
        }));
        assert_eq!(ctx.active_kafka_cluster_id(), "");
        assert!(ctx.kafka_cluster_config("lkc-1").is_none());
    }

    #[test]
    fn test_remove_kafka_cluster_in_current_environment() {
        let mut ctx = context(CredentialKind::InteractiveLogin, logged_in_state("tok", "env-1"));
        ctx.add_kafka_cluster_config(KafkaClusterConfig::new("lkc-1"));
        ctx.set_active_kafka_cluster("lkc-1");

        assert!(ctx.remove_kafka_cluster("lkc-1").is_some());
        assert_eq!(ctx.active_kafka_cluster_id(), "");
        assert!(ctx.remove_kafka_cluster("lkc-1").is_none());
    }

    #[test]
    fn test_account_override_first_wins() {
        let mut ctx = context(CredentialKind::InteractiveLogin, logged_in_state("tok", "env-1"));
        ctx.override_account(Account {
            id: "env-2".into(),
            name: String::new(),
        });
        ctx.override_account(Account {
            id: "env-3".into(),
            name: String::new(),
        });
        assert_eq!(ctx.current_environment_id(), "env-3");

        let overridden = ctx.swap_in_original_account().unwrap();
        assert_eq!(ctx.current_environment_id(), "env-1");
        assert_eq!(overridden.unwrap().id, "env-3");
    }
}
