mod config;
mod context;

pub use config::DynamicConfig;
pub use context::DynamicContext;
