#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod cli;
pub use cli::{init_tracing_subscriber, ReplayCli};

pub mod account;
pub mod neard;
pub mod rpc;

mod orchestrator;
pub use orchestrator::{open_database, replay, run};
