use std::sync::{Arc, Mutex};

/// 面向用户的警告输出，由调用方注入
pub trait WarningSink: Send + Sync + std::fmt::Debug {
    fn warn(&self, message: &str);
}

/// 写到 stderr，同时记一条 tracing 日志
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl WarningSink for StderrSink {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
        eprintln!("{}", message);
    }
}

/// 收集警告，测试里用来断言
#[derive(Debug, Default, Clone)]
pub struct CaptureSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl WarningSink for CaptureSink {
    fn warn(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

pub fn stderr() -> Arc<dyn WarningSink> {
    Arc::new(StderrSink)
}
