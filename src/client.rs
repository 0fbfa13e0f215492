//! 外部协作方接口：命令行参数解析和远端服务查询。
//! 具体实现不在本 crate 内，命令层注入。

use crate::error::Result;

/// 命令行覆盖值。返回空字符串表示没有覆盖。
pub trait FlagResolver {
    fn resolve_context_flag(&self) -> Result<String>;
    fn resolve_environment_flag(&self) -> Result<String>;
    fn resolve_cluster_flag(&self) -> Result<String>;
    fn resolve_resource_id(&self) -> Result<String>;
}

/// 远端返回的 Kafka 集群描述
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteKafkaCluster {
    pub id: String,
    pub name: String,
    /// 可能带 `SASL_SSL://` 前缀
    pub endpoint: String,
    pub api_endpoint: String,
    pub rest_endpoint: String,
}

/// 远端返回的 API key 描述
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteApiKey {
    pub key: String,
    /// key 所属的资源（集群）id
    pub resource_ids: Vec<String>,
}

/// 远端返回的 Schema Registry 集群描述
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteSchemaRegistry {
    pub id: String,
    pub endpoint: String,
}

/// 远端查询。调用是同步阻塞的，错误原样返回给调用方。
pub trait ContextClient {
    fn fetch_kafka_cluster(
        &self,
        environment_id: &str,
        cluster_id: &str,
    ) -> Result<RemoteKafkaCluster>;

    fn fetch_api_key(&self, environment_id: &str, key: &str) -> Result<RemoteApiKey>;

    fn fetch_schema_registry_by_id(
        &self,
        environment_id: &str,
        cluster_id: &str,
    ) -> Result<RemoteSchemaRegistry>;

    fn fetch_schema_registry_by_environment(
        &self,
        environment_id: &str,
    ) -> Result<RemoteSchemaRegistry>;
}
