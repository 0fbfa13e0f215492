use crate::client::{ContextClient, FlagResolver};
use crate::core::ConfigStore;
use crate::dynamic::DynamicContext;
use crate::error::{ConfigError, Result};

/// 单次命令内的配置视图。每次命令新建，命令结束即丢弃。
pub struct DynamicConfig<'a> {
    config: &'a mut ConfigStore,
    resolver: &'a dyn FlagResolver,
    client: Option<&'a dyn ContextClient>,
}

impl<'a> DynamicConfig<'a> {
    pub fn new(
        config: &'a mut ConfigStore,
        resolver: &'a dyn FlagResolver,
        client: Option<&'a dyn ContextClient>,
    ) -> Self {
        Self {
            config,
            resolver,
            client,
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &*self.config
    }

    /// 应用 context 覆盖（原值排队等 save 时换回），再交给解析出的 context 处理环境和集群覆盖
    pub fn parse_flags_into_config(&mut self) -> Result<()> {
        let name = self.resolver.resolve_context_flag()?;
        if !name.is_empty() && name != self.config.current_context {
            if !self.config.contexts.contains_key(&name) {
                return Err(ConfigError::ContextNotFound(name));
            }
            tracing::debug!("当前 context 覆盖为 {}", name);
            self.config.override_context(&name);
        }

        match self.context() {
            Some(mut context) => context.parse_flags_into_context(),
            None => Ok(()),
        }
    }

    /// 当前 context；没有设置当前 context 时为 None
    pub fn context(&mut self) -> Option<DynamicContext<'_>> {
        let name = self.config.current_context.clone();
        if !self.config.contexts.contains_key(&name) {
            return None;
        }
        Some(DynamicContext::new(
            &mut *self.config,
            &name,
            self.resolver,
            self.client,
        ))
    }

    pub fn find_context(&mut self, name: &str) -> Result<DynamicContext<'_>> {
        if !self.config.contexts.contains_key(name) {
            return Err(ConfigError::ContextNotFound(name.to_string()));
        }
        Ok(DynamicContext::new(
            &mut *self.config,
            name,
            self.resolver,
            self.client,
        ))
    }

    pub fn save(&mut self) -> Result<()> {
        self.config.save()
    }
}
