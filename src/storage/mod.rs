mod file;

pub use file::{default_config_path, Storage};
