//! 测试用的样例配置和假的协作方

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;

use tempfile::TempDir;

use crate::client::{
    ContextClient, FlagResolver, RemoteApiKey, RemoteKafkaCluster, RemoteSchemaRegistry,
};
use crate::core::{ConfigStore, Flavor, LoadParams};
use crate::error::{ConfigError, Result};
use crate::models::{
    Account, ApiKeyPair, AuthConfig, ContextState, Credential, CredentialKind, KafkaClusterConfig,
    Platform,
};
use crate::warn::CaptureSink;

pub fn platform(name: &str) -> Platform {
    Platform {
        name: name.to_string(),
        server: format!("https://{}.example.com", name),
    }
}

pub fn login_credential(name: &str) -> Credential {
    Credential {
        name: name.to_string(),
        username: "user@example.com".to_string(),
        api_key_pair: None,
        credential_type: CredentialKind::InteractiveLogin,
    }
}

pub fn api_key_credential(name: &str) -> Credential {
    Credential {
        name: name.to_string(),
        username: String::new(),
        api_key_pair: Some(key_pair("login-key", "login-secret")),
        credential_type: CredentialKind::StaticKeyPair,
    }
}

pub fn key_pair(key: &str, secret: &str) -> ApiKeyPair {
    ApiKeyPair {
        key: key.to_string(),
        secret: secret.to_string(),
    }
}

fn account(id: &str) -> Account {
    Account {
        id: id.to_string(),
        name: format!("{} name", id),
    }
}

/// 已登录，当前环境为 `environment`，已知环境 env-a 和 env-b
pub fn logged_in_state(environment: &str) -> ContextState {
    ContextState {
        auth: Some(AuthConfig {
            user: "user@example.com".to_string(),
            account: Some(account(environment)),
            accounts: vec![account("env-a"), account("env-b")],
            organization: "org-1".to_string(),
        }),
        auth_token: "token".to_string(),
    }
}

pub fn kafka_cluster(id: &str) -> KafkaClusterConfig {
    let mut cluster = KafkaClusterConfig::new(id);
    cluster.name = format!("{}-name", id);
    cluster.bootstrap_servers = format!("{}.example.com:9092", id);
    cluster
}

pub fn empty_store(tmp: &TempDir) -> ConfigStore {
    ConfigStore::new(
        LoadParams::new(&tmp.path().join("config.json"), Flavor::Cloud)
            .with_sink(Arc::new(CaptureSink::new())),
    )
}

/// 两个 context：
/// - ctx-a（当前）：交互式登录，按环境隔离，env-a 当前集群 lkc-a，env-b 当前集群 lkc-b
/// - ctx-b：静态 key，全局集群表，当前集群 lkc-1（没有 key）
pub fn sample_store(tmp: &TempDir) -> ConfigStore {
    let mut store = empty_store(tmp);
    store.save_platform(platform("p")).unwrap();
    store.save_credential(login_credential("login")).unwrap();
    store.save_credential(api_key_credential("key")).unwrap();
    store
        .add_context(
            "ctx-a",
            "p",
            "login",
            vec![kafka_cluster("lkc-a")],
            "lkc-a",
            logged_in_state("env-a"),
        )
        .unwrap();
    {
        let kcc = &mut store.contexts.get_mut("ctx-a").unwrap().kafka_cluster_context;
        kcc.add_kafka_cluster_config("env-b", kafka_cluster("lkc-b"));
        kcc.set_active_kafka_cluster("env-b", "lkc-b");
    }
    store
        .add_context(
            "ctx-b",
            "p",
            "key",
            vec![kafka_cluster("lkc-1")],
            "lkc-1",
            ContextState::default(),
        )
        .unwrap();
    store
}

/// 固定的命令行覆盖值
#[derive(Debug, Default, Clone)]
pub struct FakeFlags {
    pub context: String,
    pub environment: String,
    pub cluster: String,
    pub resource: String,
}

impl FlagResolver for FakeFlags {
    fn resolve_context_flag(&self) -> Result<String> {
        Ok(self.context.clone())
    }

    fn resolve_environment_flag(&self) -> Result<String> {
        Ok(self.environment.clone())
    }

    fn resolve_cluster_flag(&self) -> Result<String> {
        Ok(self.cluster.clone())
    }

    fn resolve_resource_id(&self) -> Result<String> {
        Ok(self.resource.clone())
    }
}

/// 记录调用次数的远端
#[derive(Debug, Default)]
pub struct FakeClient {
    kafka_clusters: BTreeMap<String, RemoteKafkaCluster>,
    api_keys: BTreeMap<String, RemoteApiKey>,
    /// 按环境 id 索引
    schema_registries: BTreeMap<String, RemoteSchemaRegistry>,
    calls: Cell<usize>,
}

impl FakeClient {
    pub fn with_kafka_cluster(mut self, id: &str, endpoint: &str) -> Self {
        self.kafka_clusters.insert(
            id.to_string(),
            RemoteKafkaCluster {
                id: id.to_string(),
                name: format!("{}-name", id),
                endpoint: endpoint.to_string(),
                api_endpoint: format!("https://api.{}.example.com", id),
                rest_endpoint: format!("https://rest.{}.example.com", id),
            },
        );
        self
    }

    pub fn with_api_key(mut self, key: RemoteApiKey) -> Self {
        self.api_keys.insert(key.key.clone(), key);
        self
    }

    pub fn with_schema_registry(mut self, environment: &str, id: &str) -> Self {
        self.schema_registries.insert(
            environment.to_string(),
            RemoteSchemaRegistry {
                id: id.to_string(),
                endpoint: format!("https://{}.example.com", id),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn record(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl ContextClient for FakeClient {
    fn fetch_kafka_cluster(
        &self,
        _environment_id: &str,
        cluster_id: &str,
    ) -> Result<RemoteKafkaCluster> {
        self.record();
        self.kafka_clusters
            .get(cluster_id)
            .cloned()
            .ok_or_else(|| ConfigError::Remote(format!("kafka cluster {} not found", cluster_id)))
    }

    fn fetch_api_key(&self, _environment_id: &str, key: &str) -> Result<RemoteApiKey> {
        self.record();
        self.api_keys
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::Remote(format!("api key {} not found", key)))
    }

    fn fetch_schema_registry_by_id(
        &self,
        _environment_id: &str,
        cluster_id: &str,
    ) -> Result<RemoteSchemaRegistry> {
        self.record();
        self.schema_registries
            .values()
            .find(|sr| sr.id == cluster_id)
            .cloned()
            .ok_or_else(|| ConfigError::Remote(format!("schema registry {} not found", cluster_id)))
    }

    fn fetch_schema_registry_by_environment(
        &self,
        environment_id: &str,
    ) -> Result<RemoteSchemaRegistry> {
        self.record();
        self.schema_registries
            .get(environment_id)
            .cloned()
            .ok_or_else(|| {
                ConfigError::Remote(format!("no schema registry in environment {}", environment_id))
            })
    }
}
