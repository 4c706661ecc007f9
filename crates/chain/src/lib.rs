#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod block;
pub use block::Block;

mod errors;
pub use errors::{ChainError, ChainResult};

mod accessor;
pub use accessor::ChainAccessor;

mod mem;
pub use mem::MemoryChainDb;

#[cfg(feature = "disk")]
mod disk;
#[cfg(feature = "disk")]
pub use disk::DiskChainDb;

mod indexer;
pub use indexer::{ChainIndex, ChainIndexer};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
