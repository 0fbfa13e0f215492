use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 服务端点
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Platform {
    pub name: String,
    pub server: String,
}

/// 认证方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// 交互式登录，会话由 auth token 表示
    InteractiveLogin,
    /// 静态 key/secret，没有会话
    StaticKeyPair,
    #[default]
    None,
}

/// API key 与 secret
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ApiKeyPair {
    pub key: String,
    #[serde(default)]
    pub secret: String,
}

/// 认证凭据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Credential {
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_pair: Option<ApiKeyPair>,
    #[serde(default)]
    pub credential_type: CredentialKind,
}

/// 远端环境（账户）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// 登录后的账户信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub user: String,
    /// 当前环境
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub organization: String,
}

/// context 的会话状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContextState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub auth_token: String,
}

impl ContextState {
    /// 当前绑定环境的 id，没有则为空
    pub fn account_id(&self) -> &str {
        self.auth
            .as_ref()
            .and_then(|a| a.account.as_ref())
            .map(|a| a.id.as_str())
            .unwrap_or("")
    }

    /// 按 id 查找已知环境
    pub fn find_account(&self, id: &str) -> Option<&Account> {
        self.auth
            .as_ref()
            .and_then(|a| a.accounts.iter().find(|acc| acc.id == id))
    }
}

/// Kafka 集群连接信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct KafkaClusterConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bootstrap_servers: String,
    #[serde(default)]
    pub api_endpoint: String,
    #[serde(default)]
    pub rest_endpoint: String,
    /// 已知的 key，按 key 值索引。文件里缺失时为 None，校验时补成空表
    #[serde(default)]
    pub api_keys: Option<BTreeMap<String, ApiKeyPair>>,
    /// 当前使用的 key，必须在 api_keys 中
    #[serde(default)]
    pub api_key: String,
}

impl KafkaClusterConfig {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            api_keys: Some(BTreeMap::new()),
            ..Default::default()
        }
    }

    pub fn has_api_key(&self, key: &str) -> bool {
        self.api_keys
            .as_ref()
            .map(|keys| keys.contains_key(key))
            .unwrap_or(false)
    }

    pub fn api_keys_mut(&mut self) -> &mut BTreeMap<String, ApiKeyPair> {
        self.api_keys.get_or_insert_with(BTreeMap::new)
    }
}

/// Schema Registry 集群
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SchemaRegistryCluster {
    pub id: String,
    #[serde(default)]
    pub schema_registry_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ApiKeyPair>,
}

impl SchemaRegistryCluster {
    /// endpoint 或 id 缺失时需要重新拉取
    pub fn missing_details(&self) -> bool {
        self.id.is_empty() || self.schema_registry_endpoint.is_empty()
    }
}
