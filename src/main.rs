use std::path::PathBuf;

use profile_store::core::{ConfigStore, Flavor, LoadParams};
use profile_store::storage::default_config_path;

const TOOL_NAME: &str = "profile-store";
const CONFIG_PATH_ENV: &str = "PROFILE_STORE_CONFIG";
const FLAVOR_ENV: &str = "PROFILE_STORE_FLAVOR";

fn main() {
    tracing_subscriber::fmt::init();

    let path = match std::env::var(CONFIG_PATH_ENV) {
        Ok(p) if !p.is_empty() => PathBuf::from(p),
        _ => match default_config_path(TOOL_NAME) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Failed to locate config: {}", e);
                std::process::exit(1);
            }
        },
    };
    let flavor = match std::env::var(FLAVOR_ENV).as_deref() {
        Ok("platform") => Flavor::Platform,
        _ => Flavor::Cloud,
    };

    let store = match ConfigStore::load(LoadParams::new(&path, flavor)) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // 列出所有 context，当前的用 * 标记
    for name in store.context_names() {
        let marker = if name == store.current_context { "*" } else { " " };
        println!("{} {}", marker, name);
    }
}
