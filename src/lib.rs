pub mod client;
pub mod core;
pub mod dynamic;
pub mod error;
pub mod models;
pub mod storage;
pub mod warn;

#[cfg(test)]
mod test_support;
