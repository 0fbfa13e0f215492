pub mod context;
pub mod kafka;
pub mod overwrite;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::models::{
    Account, ContextState, Credential, CredentialKind, KafkaClusterConfig, Platform,
};
use crate::storage::Storage;
use crate::warn::{self, WarningSink};

pub use context::Context;
pub use kafka::{KafkaClusterContext, PendingActive};
pub use overwrite::Override;

/// 当前工具能读写的配置文件版本
pub const CONFIG_VERSION: u32 = 3;

/// 工具形态：云服务版按环境隔离集群，本地部署版只有一个全局集群表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    #[default]
    Cloud,
    Platform,
}

/// 加载配置时注入的运行参数
#[derive(Debug, Clone)]
pub struct LoadParams {
    pub path: PathBuf,
    pub flavor: Flavor,
    pub sink: Arc<dyn WarningSink>,
}

impl LoadParams {
    pub fn new(path: &Path, flavor: Flavor) -> Self {
        Self {
            path: path.to_path_buf(),
            flavor,
            sink: warn::stderr(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.sink = sink;
        self
    }
}

/// 持久化的配置文档：platform、credential、context 及其状态、当前 context。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigStore {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub disable_update_check: bool,
    #[serde(default)]
    pub disable_updates: bool,
    #[serde(default)]
    pub no_browser: bool,
    #[serde(default)]
    pub platforms: BTreeMap<String, Platform>,
    #[serde(default)]
    pub credentials: BTreeMap<String, Credential>,
    #[serde(default)]
    pub contexts: BTreeMap<String, Context>,
    #[serde(default)]
    pub context_states: BTreeMap<String, ContextState>,
    #[serde(default)]
    pub current_context: String,
    #[serde(default)]
    pub anonymous_id: String,
    #[serde(skip)]
    storage: Storage,
    #[serde(skip)]
    flavor: Flavor,
    #[serde(skip, default = "warn::stderr")]
    sink: Arc<dyn WarningSink>,
    #[serde(skip)]
    pending_context: Override<String>,
}

impl PartialEq for ConfigStore {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.disable_update_check == other.disable_update_check
            && self.disable_updates == other.disable_updates
            && self.no_browser == other.no_browser
            && self.platforms == other.platforms
            && self.credentials == other.credentials
            && self.contexts == other.contexts
            && self.context_states == other.context_states
            && self.current_context == other.current_context
            && self.anonymous_id == other.anonymous_id
    }
}

/// save 期间被换下的覆盖值
#[derive(Default)]
struct SwappedOverrides {
    context: Option<String>,
    accounts: Vec<(String, Option<Account>)>,
    clusters: Vec<(String, PendingActive)>,
}

impl ConfigStore {
    /// 空配置
    pub fn new(params: LoadParams) -> Self {
        Self {
            version: CONFIG_VERSION,
            disable_update_check: false,
            disable_updates: false,
            no_browser: false,
            platforms: BTreeMap::new(),
            credentials: BTreeMap::new(),
            contexts: BTreeMap::new(),
            context_states: BTreeMap::new(),
            current_context: String::new(),
            anonymous_id: uuid::Uuid::new_v4().to_string(),
            storage: Storage::new(&params.path),
            flavor: params.flavor,
            sink: params.sink,
            pending_context: Override::Unset,
        }
    }

    /// 从文件加载。文件不存在则写入并返回默认配置；版本不一致直接报错。
    pub fn load(params: LoadParams) -> Result<Self> {
        let storage = Storage::new(&params.path);
        let content = match storage.read()? {
            Some(content) => content,
            None => {
                tracing::debug!("配置文件不存在，初始化 {}", params.path.display());
                let mut store = Self::new(params);
                store.save()?;
                return Ok(store);
            }
        };

        let path = storage.file_path().to_path_buf();
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| ConfigError::corrupted(&path, format!("failed to parse: {}", e)))?;
        let found = value
            .get("version")
            .and_then(|v| v.as_u64())
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(0);
        if found < CONFIG_VERSION {
            return Err(ConfigError::ConfigNotUpToDate {
                file: path,
                found,
                expected: CONFIG_VERSION,
            });
        }
        if found > CONFIG_VERSION {
            return Err(ConfigError::UnsupportedConfigVersion {
                file: path,
                found,
                expected: CONFIG_VERSION,
            });
        }

        let mut store: ConfigStore = serde_json::from_value(value)
            .map_err(|e| ConfigError::corrupted(&path, format!("failed to parse: {}", e)))?;
        store.storage = storage;
        store.flavor = params.flavor;
        store.sink = params.sink;

        let mut changed = false;
        if store.anonymous_id.is_empty() {
            store.anonymous_id = uuid::Uuid::new_v4().to_string();
            changed = true;
        }
        store.wire();
        changed |= store.check_and_repair()?;
        if changed {
            store.save()?;
        }
        Ok(store)
    }

    /// 按名字把 state 和 credential 类型接回每个 context
    fn wire(&mut self) {
        for (name, context) in self.contexts.iter_mut() {
            if let Some(state) = self.context_states.get(name) {
                context.state = state.clone();
            }
            if let Some(credential) = self.credentials.get(&context.credential_name) {
                context.credential_kind = credential.credential_type;
            }
        }
    }

    /// 先把覆盖值换回原值，校验并写盘，最后恢复覆盖值。
    /// 磁盘上永远不会出现只由命令行参数给出的值。
    pub fn save(&mut self) -> Result<()> {
        let swapped = self.swap_in_originals();
        let result = match self.check_and_repair() {
            Ok(_) => self.storage.write(&*self),
            Err(e) => Err(e),
        };
        self.restore_overrides(swapped);
        result
    }

    fn swap_in_originals(&mut self) -> SwappedOverrides {
        let mut swapped = SwappedOverrides::default();
        if let Some(original) = self.pending_context.get().cloned() {
            swapped.context = Some(std::mem::replace(&mut self.current_context, original));
        }

        let mut touched = Vec::new();
        for (name, context) in self.contexts.iter_mut() {
            if let Some(overridden) = context.swap_in_original_account() {
                swapped.accounts.push((name.clone(), overridden));
                touched.push(name.clone());
            }
            if let Some(overridden) = context.kafka_cluster_context.swap_in_original() {
                swapped.clusters.push((name.clone(), overridden));
            }
        }
        for name in touched {
            self.sync_state(&name);
        }
        swapped
    }

    fn restore_overrides(&mut self, swapped: SwappedOverrides) {
        for (name, overridden) in swapped.clusters {
            if let Some(context) = self.contexts.get_mut(&name) {
                context.kafka_cluster_context.restore_override(overridden);
            }
        }
        for (name, overridden) in swapped.accounts {
            if let Some(context) = self.contexts.get_mut(&name) {
                context.set_account(overridden);
            }
            self.sync_state(&name);
        }
        if let Some(overridden) = swapped.context {
            self.current_context = overridden;
        }
    }

    /// 校验结构不变量；违反则报配置损坏
    pub fn validate(&mut self) -> Result<()> {
        self.check_and_repair().map(|_| ())
    }

    /// 结构问题直接报错，Kafka 集群表里的问题自动修复并提示。返回是否做了修复。
    fn check_and_repair(&mut self) -> Result<bool> {
        let file = self.storage.file_path().to_path_buf();

        if !self.current_context.is_empty() && !self.contexts.contains_key(&self.current_context) {
            return Err(ConfigError::corrupted(
                &file,
                format!(
                    "the current context \"{}\" does not exist",
                    self.current_context
                ),
            ));
        }

        let mut repaired = false;
        for (name, context) in self.contexts.iter_mut() {
            if context.name.is_empty() || context.name != *name {
                return Err(ConfigError::corrupted(
                    &file,
                    format!("context \"{}\" is stored under the name \"{}\"", context.name, name),
                ));
            }
            if !self.credentials.contains_key(&context.credential_name) {
                return Err(ConfigError::corrupted(
                    &file,
                    format!(
                        "credential \"{}\" of context \"{}\" does not exist",
                        context.credential_name, name
                    ),
                ));
            }
            if !self.platforms.contains_key(&context.platform_name) {
                return Err(ConfigError::corrupted(
                    &file,
                    format!(
                        "platform \"{}\" of context \"{}\" does not exist",
                        context.platform_name, name
                    ),
                ));
            }
            match self.context_states.get(name) {
                Some(state) if *state != context.state => {
                    return Err(ConfigError::corrupted(
                        &file,
                        format!("context state mismatch for context \"{}\"", name),
                    ));
                }
                Some(_) => {}
                None => {
                    self.context_states
                        .insert(name.clone(), context.state.clone());
                    repaired = true;
                }
            }
            repaired |= context
                .kafka_cluster_context
                .validate(name, self.sink.as_ref());
        }

        if let Some(orphan) = self
            .context_states
            .keys()
            .find(|name| !self.contexts.contains_key(*name))
        {
            return Err(ConfigError::corrupted(
                &file,
                format!("context state \"{}\" has no matching context", orphan),
            ));
        }

        Ok(repaired)
    }

    /// context 的 state 拷贝到顶层 context_states，两份保持一致
    fn sync_state(&mut self, name: &str) {
        if let Some(context) = self.contexts.get(name) {
            self.context_states
                .insert(name.to_string(), context.state.clone());
        }
    }

    pub fn file_path(&self) -> &Path {
        self.storage.file_path()
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn is_cloud(&self) -> bool {
        self.flavor == Flavor::Cloud
    }

    pub fn sink(&self) -> &dyn WarningSink {
        self.sink.as_ref()
    }

    /// 当前 context，没有设置则为 None
    pub fn context(&self) -> Option<&Context> {
        self.contexts.get(&self.current_context)
    }

    pub fn context_mut(&mut self) -> Option<&mut Context> {
        self.contexts.get_mut(&self.current_context)
    }

    pub fn find_context(&self, name: &str) -> Result<&Context> {
        self.contexts
            .get(name)
            .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))
    }

    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.keys().map(|s| s.as_str()).collect()
    }

    /// 当前 context 是否已登录；没有当前 context 视为未登录
    pub fn has_login(&self) -> Result<bool> {
        match self.context() {
            Some(context) => context.has_login(),
            None => Ok(false),
        }
    }

    /// 根据工具形态和认证方式选择 Kafka 集群表的模式
    pub fn new_kafka_cluster_context(&self, kind: CredentialKind) -> KafkaClusterContext {
        if self.is_cloud() && kind == CredentialKind::InteractiveLogin {
            KafkaClusterContext::environment_scoped()
        } else {
            KafkaClusterContext::global()
        }
    }

    /// 添加 context。名字为空或重复、credential 或 platform 不存在则报错。
    /// 写时持久化，失败回滚。
    pub fn add_context(
        &mut self,
        name: &str,
        platform_name: &str,
        credential_name: &str,
        kafka_clusters: Vec<KafkaClusterConfig>,
        active_kafka: &str,
        state: ContextState,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(ConfigError::EmptyContextName);
        }
        if self.contexts.contains_key(name) {
            return Err(ConfigError::ContextAlreadyExists(name.to_string()));
        }
        let kind = self
            .credentials
            .get(credential_name)
            .map(|c| c.credential_type)
            .ok_or_else(|| ConfigError::CredentialNotFound(credential_name.to_string()))?;
        if !self.platforms.contains_key(platform_name) {
            return Err(ConfigError::PlatformNotFound(platform_name.to_string()));
        }

        let kafka = self.new_kafka_cluster_context(kind);
        let mut context = Context::new(name, platform_name, credential_name, kind, kafka, state);
        for cluster in kafka_clusters {
            context.add_kafka_cluster_config(cluster);
        }
        if !active_kafka.is_empty() {
            context.set_active_kafka_cluster(active_kafka);
        }

        let previous_current = self.current_context.clone();
        self.context_states
            .insert(name.to_string(), context.state.clone());
        self.contexts.insert(name.to_string(), context);
        if self.current_context.is_empty() {
            self.current_context = name.to_string();
        }

        if let Err(e) = self.save() {
            // 回滚
            self.contexts.remove(name);
            self.context_states.remove(name);
            self.current_context = previous_current;
            return Err(e);
        }
        Ok(())
    }

    /// 删除 context 及其 state；如果是当前 context 则清空当前 context。
    /// 写时持久化，失败回滚。
    pub fn delete_context(&mut self, name: &str) -> Result<()> {
        let context = self
            .contexts
            .remove(name)
            .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))?;
        let state = self.context_states.remove(name);
        let previous_current = self.current_context.clone();
        let previous_pending = self.pending_context.clone();
        if self.current_context == name {
            self.current_context.clear();
        }
        if self.pending_context.get().map(String::as_str) == Some(name) {
            self.pending_context = Override::SetTo(String::new());
        }

        if let Err(e) = self.save() {
            // 回滚
            self.contexts.insert(name.to_string(), context);
            if let Some(state) = state {
                self.context_states.insert(name.to_string(), state);
            }
            self.current_context = previous_current;
            self.pending_context = previous_pending;
            return Err(e);
        }
        Ok(())
    }

    /// 显式切换当前 context 并持久化，同时放弃本次命令的 context 覆盖
    pub fn set_context(&mut self, name: &str) -> Result<()> {
        if !self.contexts.contains_key(name) {
            return Err(ConfigError::ContextNotFound(name.to_string()));
        }
        let previous_current = std::mem::replace(&mut self.current_context, name.to_string());
        let previous_pending = std::mem::take(&mut self.pending_context);

        if let Err(e) = self.save() {
            self.current_context = previous_current;
            self.pending_context = previous_pending;
            return Err(e);
        }
        Ok(())
    }

    /// 命令行覆盖当前 context，原值只记录第一次
    pub(crate) fn override_context(&mut self, name: &str) {
        let original = self.current_context.clone();
        self.pending_context.capture(original);
        self.current_context = name.to_string();
    }

    pub fn pending_context(&self) -> Option<&str> {
        self.pending_context.get().map(String::as_str)
    }

    /// 保存 credential，同名覆盖；引用它的 context 同步认证方式。
    /// 写时持久化，失败回滚。
    pub fn save_credential(&mut self, credential: Credential) -> Result<()> {
        let name = credential.name.clone();
        let kind = credential.credential_type;
        let previous = self.credentials.insert(name.clone(), credential);
        let mut previous_kinds = Vec::new();
        for context in self.contexts.values_mut() {
            if context.credential_name == name {
                previous_kinds.push((context.name.clone(), context.credential_kind));
                context.credential_kind = kind;
            }
        }

        if let Err(e) = self.save() {
            match previous {
                Some(previous) => {
                    self.credentials.insert(name, previous);
                }
                None => {
                    self.credentials.remove(&name);
                }
            }
            for (context_name, previous_kind) in previous_kinds {
                if let Some(context) = self.contexts.get_mut(&context_name) {
                    context.credential_kind = previous_kind;
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// 保存 platform，同名覆盖。写时持久化，失败回滚。
    pub fn save_platform(&mut self, platform: Platform) -> Result<()> {
        let name = platform.name.clone();
        let previous = self.platforms.insert(name.clone(), platform);

        if let Err(e) = self.save() {
            match previous {
                Some(previous) => {
                    self.platforms.insert(name, previous);
                }
                None => {
                    self.platforms.remove(&name);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// 替换某个 context 的会话状态（登录/登出后调用），两份 state 同时更新
    pub fn set_context_state(&mut self, name: &str, state: ContextState) -> Result<()> {
        let context = self
            .contexts
            .get_mut(name)
            .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))?;
        context.state = state;
        self.sync_state(name);
        Ok(())
    }

    /// 命令行覆盖某个 context 的当前环境，两份 state 同时更新
    pub(crate) fn override_account(&mut self, name: &str, account: Account) -> Result<()> {
        let context = self
            .contexts
            .get_mut(name)
            .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))?;
        context.override_account(account);
        self.sync_state(name);
        Ok(())
    }
}
