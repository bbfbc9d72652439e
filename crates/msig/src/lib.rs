pub mod activity;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod programs;
pub mod registry;
pub mod rpc;
pub mod status;
#[cfg(any(test, feature = "testing"))]
pub mod test_utils;
pub mod transitions;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod tests;
