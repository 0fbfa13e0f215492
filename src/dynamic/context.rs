use crate::client::{ContextClient, FlagResolver};
use crate::core::{ConfigStore, Context};
use crate::error::{ConfigError, Result};
use crate::models::{
    ApiKeyPair, ContextState, CredentialKind, KafkaClusterConfig, SchemaRegistryCluster,
};

/// 远端 bootstrap 地址带的协议前缀
const BOOTSTRAP_SCHEME_PREFIX: &str = "SASL_SSL://";
/// Schema Registry 资源 id 前缀
const SCHEMA_REGISTRY_ID_PREFIX: &str = "lsrc-";

/// 单次命令内的 context 视图：叠加命令行覆盖，按需从远端拉取并缓存。
/// 自身不持久化任何东西，全部经由 `ConfigStore::save`。
pub struct DynamicContext<'a> {
    config: &'a mut ConfigStore,
    name: String,
    resolver: &'a dyn FlagResolver,
    client: Option<&'a dyn ContextClient>,
}

impl<'a> DynamicContext<'a> {
    pub(crate) fn new(
        config: &'a mut ConfigStore,
        name: &str,
        resolver: &'a dyn FlagResolver,
        client: Option<&'a dyn ContextClient>,
    ) -> Self {
        Self {
            config,
            name: name.to_string(),
            resolver,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> Result<&Context> {
        self.config.find_context(&self.name)
    }

    fn context_mut(&mut self) -> Result<&mut Context> {
        self.config
            .contexts
            .get_mut(&self.name)
            .ok_or_else(|| ConfigError::ContextNotFound(self.name.clone()))
    }

    fn client(&self, what: impl Into<String>) -> Result<&'a dyn ContextClient> {
        self.client.ok_or_else(|| ConfigError::NoClient(what.into()))
    }

    pub fn save(&mut self) -> Result<()> {
        self.config.save()
    }

    pub fn has_login(&self) -> Result<bool> {
        self.context()?.has_login()
    }

    /// 应用环境和集群覆盖，原值排队等 save 时换回
    pub fn parse_flags_into_context(&mut self) -> Result<()> {
        let environment = self.resolver.resolve_environment_flag()?;
        if !environment.is_empty() {
            let context = self.context()?;
            if context.credential_kind() == CredentialKind::StaticKeyPair {
                return Err(ConfigError::EnvironmentFlagWithApiKey);
            }
            let account = context
                .state
                .find_account(&environment)
                .cloned()
                .ok_or_else(|| ConfigError::EnvironmentNotFound(environment.clone()))?;
            if context.current_environment_id() != environment {
                tracing::debug!("context {} 覆盖环境为 {}", self.name, environment);
                let name = self.name.clone();
                self.config.override_account(&name, account)?;
            }
        }

        let cluster = self.resolver.resolve_cluster_flag()?;
        if !cluster.is_empty() {
            let context = self.context_mut()?;
            if context.active_kafka_cluster_id() != cluster {
                tracing::debug!("context {} 覆盖当前集群为 {}", context.name, cluster);
                context.override_active_kafka_cluster(&cluster);
            }
        }
        Ok(())
    }

    /// 有效环境：命令行覆盖优先，其次是持久化的当前环境。不检查登录。
    fn environment_id(&self) -> Result<String> {
        let flag = self.resolver.resolve_environment_flag()?;
        if !flag.is_empty() {
            return Ok(flag);
        }
        Ok(self.context()?.current_environment_id().to_string())
    }

    /// 已登录时的有效环境
    pub fn authenticated_env_id(&self) -> Result<String> {
        if !self.context()?.has_login()? {
            return Err(ConfigError::NotLoggedIn);
        }
        self.environment_id()
    }

    fn cluster_config_mut(
        &mut self,
        environment: &str,
        cluster_id: &str,
    ) -> Result<&mut KafkaClusterConfig> {
        self.context_mut()?
            .kafka_cluster_context
            .kafka_cluster_config_mut(environment, cluster_id)
            .ok_or_else(|| ConfigError::KafkaClusterNotFound(cluster_id.to_string()))
    }

    /// 返回 state 的拷贝，当前环境换成解析出来的环境；不修改共享的 state
    pub fn authenticated_state(&self) -> Result<ContextState> {
        let environment = self.authenticated_env_id()?;
        let context = self.context()?;
        let mut state = context.state.clone();
        if environment != context.current_environment_id() {
            let account = context
                .state
                .find_account(&environment)
                .cloned()
                .ok_or_else(|| ConfigError::EnvironmentNotFound(environment.clone()))?;
            if let Some(auth) = state.auth.as_mut() {
                auth.account = Some(account);
            }
        }
        Ok(state)
    }

    /// 本地有完整配置直接返回；否则从远端拉取、缓存并持久化
    pub fn find_kafka_cluster(&mut self, cluster_id: &str) -> Result<KafkaClusterConfig> {
        let environment = self.environment_id()?;
        let existing = self
            .context()?
            .kafka_cluster_context()
            .kafka_cluster_config(&environment, cluster_id)
            .cloned();
        if let Some(cluster) = &existing {
            if !cluster.bootstrap_servers.is_empty() {
                return Ok(cluster.clone());
            }
        }

        let client = self.client(format!("Kafka cluster \"{}\"", cluster_id))?;
        if !self.context()?.has_login()? {
            return Err(ConfigError::NotLoggedIn);
        }
        tracing::debug!("从远端拉取集群 {} (环境 {})", cluster_id, environment);
        let remote = client.fetch_kafka_cluster(&environment, cluster_id)?;

        // 已缓存的 key 不因重新拉取而丢失
        let (api_keys, api_key) = match existing {
            Some(cluster) => (cluster.api_keys, cluster.api_key),
            None => (None, String::new()),
        };
        let config = KafkaClusterConfig {
            id: remote.id,
            name: remote.name,
            bootstrap_servers: remote
                .endpoint
                .strip_prefix(BOOTSTRAP_SCHEME_PREFIX)
                .unwrap_or(&remote.endpoint)
                .to_string(),
            api_endpoint: remote.api_endpoint,
            rest_endpoint: remote.rest_endpoint,
            api_keys: Some(api_keys.unwrap_or_default()),
            api_key,
        };

        self.context_mut()?
            .kafka_cluster_context
            .add_kafka_cluster_config(&environment, config.clone());
        self.save()?;
        Ok(config)
    }

    /// 当前集群的完整配置
    pub fn active_kafka_cluster(&mut self) -> Result<KafkaClusterConfig> {
        let environment = self.environment_id()?;
        let cluster_id = self
            .context()?
            .kafka_cluster_context()
            .active_kafka_cluster_id(&environment)
            .to_string();
        if cluster_id.is_empty() {
            return Err(ConfigError::NoActiveKafkaCluster);
        }
        self.find_kafka_cluster(&cluster_id)
    }

    /// 显式设置当前集群（`kafka cluster use`），会写入磁盘
    pub fn set_active_kafka_cluster(&mut self, cluster_id: &str) -> Result<()> {
        self.find_kafka_cluster(cluster_id)?;
        let environment = self.environment_id()?;
        let kafka = &mut self.context_mut()?.kafka_cluster_context;
        kafka.clear_pending_active();
        kafka.set_active_kafka_cluster(&environment, cluster_id);
        self.save()
    }

    pub fn remove_kafka_cluster_config(&mut self, cluster_id: &str) -> Result<()> {
        let environment = self.environment_id()?;
        self.context_mut()?
            .kafka_cluster_context
            .remove_kafka_cluster(&environment, cluster_id)
            .ok_or_else(|| ConfigError::KafkaClusterNotFound(cluster_id.to_string()))?;
        self.save()
    }

    /// 显式指定 Schema Registry 资源 id 时按 id 查找，否则按当前环境查找；
    /// 本地没有或信息不全则远端拉取并缓存
    pub fn schema_registry_cluster(&mut self) -> Result<SchemaRegistryCluster> {
        let resource_id = self.resolver.resolve_resource_id()?;
        let environment = self.authenticated_env_id()?;
        let context = self.context()?;

        let by_id = resource_id.starts_with(SCHEMA_REGISTRY_ID_PREFIX);
        let cached = if by_id {
            context.find_schema_registry_cluster_by_id(&resource_id)
        } else {
            context.schema_registry_cluster(&environment)
        };
        if let Some(cluster) = cached {
            if !cluster.missing_details() {
                return Ok(cluster.clone());
            }
        }
        let credentials = cached.and_then(|c| c.credentials.clone());

        let client = self.client("Schema Registry")?;
        let remote = if by_id {
            tracing::debug!("从远端拉取 Schema Registry {}", resource_id);
            client.fetch_schema_registry_by_id(&environment, &resource_id)?
        } else {
            tracing::debug!("从远端拉取环境 {} 的 Schema Registry", environment);
            client.fetch_schema_registry_by_environment(&environment)?
        };
        let cluster = SchemaRegistryCluster {
            id: remote.id,
            schema_registry_endpoint: remote.endpoint,
            credentials,
        };

        self.context_mut()?
            .set_schema_registry_cluster(&environment, cluster.clone());
        self.save()?;
        Ok(cluster)
    }

    /// 把 key 设为集群的当前 key。本地没有这个 key 时询问远端：
    /// 属于别的集群报 `InvalidApiKey`，属于这个集群但本地没有 secret 报 `UnconfiguredApiSecret`。
    pub fn use_api_key(&mut self, key: &str, cluster_id: &str) -> Result<()> {
        let cluster = self.find_kafka_cluster(cluster_id)?;
        if !cluster.has_api_key(key) {
            let client = self.client(format!("API key \"{}\"", key))?;
            let environment = self.environment_id()?;
            let remote = client.fetch_api_key(&environment, key)?;
            if !remote.resource_ids.iter().any(|id| id == cluster_id) {
                return Err(ConfigError::InvalidApiKey {
                    key: key.to_string(),
                    cluster: cluster_id.to_string(),
                });
            }
            return Err(ConfigError::UnconfiguredApiSecret {
                key: key.to_string(),
                cluster: cluster_id.to_string(),
            });
        }

        let environment = self.environment_id()?;
        self.cluster_config_mut(&environment, cluster_id)?.api_key = key.to_string();
        self.save()
    }

    /// 缓存 key/secret 到集群下（`api-key store`）
    pub fn store_api_key(&mut self, pair: ApiKeyPair, cluster_id: &str) -> Result<()> {
        self.find_kafka_cluster(cluster_id)?;
        let environment = self.environment_id()?;
        self.cluster_config_mut(&environment, cluster_id)?
            .api_keys_mut()
            .insert(pair.key.clone(), pair);
        self.save()
    }

    pub fn check_api_key_exists_locally(&self, key: &str, cluster_id: &str) -> Result<bool> {
        let environment = self.environment_id()?;
        Ok(self
            .context()?
            .kafka_cluster_context()
            .kafka_cluster_config(&environment, cluster_id)
            .map(|c| c.has_api_key(key))
            .unwrap_or(false))
    }

    /// 从所有集群删除 key 并持久化
    pub fn delete_api_key(&mut self, key: &str) -> Result<()> {
        self.context_mut()?.delete_api_key(key);
        self.save()
    }
}
