//! Contains a concrete implementation of the [ChainAccessor] trait that reads blocks from disk
//! using [rocksdb].
//!
//! Layout: `h ‖ be64(number) ‖ hash` holds the RLP header, `b ‖ be64(number) ‖ hash` holds the
//! body as produced by [Block::encode_body].

use crate::{Block, ChainAccessor, ChainError, ChainResult};
use alloy_consensus::Header;
use alloy_primitives::B256;
use alloy_rlp::{Decodable, Encodable};
use rocksdb::{Options, DB};
use std::path::{Path, PathBuf};
use tracing::info;

const HEADER_PREFIX: u8 = b'h';
const BODY_PREFIX: u8 = b'b';

/// A block store backed by a RocksDB database on disk.
#[derive(Debug)]
pub struct DiskChainDb {
    data_directory: PathBuf,
    db: DB,
}

impl DiskChainDb {
    /// Opens the database at the given directory in read-only mode.
    pub fn open_read_only(data_directory: impl AsRef<Path>) -> ChainResult<Self> {
        let data_directory = data_directory.as_ref().to_path_buf();
        let db = DB::open_for_read_only(&Self::get_db_options(), &data_directory, false)
            .map_err(|e| {
                ChainError::Database(format!(
                    "failed to open database at {}: {e}",
                    data_directory.display()
                ))
            })?;
        info!(target: "chain_db", "Opened source database at {}", data_directory.display());
        Ok(Self { data_directory, db })
    }

    /// Opens (creating if missing) a writable database at the given directory.
    pub fn open(data_directory: impl AsRef<Path>) -> ChainResult<Self> {
        let data_directory = data_directory.as_ref().to_path_buf();
        let mut options = Self::get_db_options();
        options.create_if_missing(true);
        let db = DB::open(&options, &data_directory).map_err(|e| {
            ChainError::Database(format!(
                "failed to open database at {}: {e}",
                data_directory.display()
            ))
        })?;
        Ok(Self { data_directory, db })
    }

    /// Gets the [Options] for the underlying RocksDB instance.
    fn get_db_options() -> Options {
        let mut options = Options::default();
        options.set_compression_type(rocksdb::DBCompressionType::Snappy);
        options
    }

    /// Returns the directory the database lives in.
    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }

    /// Writes a block under its height and header hash. Returns the hash.
    pub fn insert(&self, block: &Block) -> ChainResult<B256> {
        let hash = block.hash();
        let mut header = Vec::with_capacity(block.header.length());
        block.header.encode(&mut header);
        self.db
            .put(Self::key(HEADER_PREFIX, block.number(), hash), header)
            .map_err(|e| ChainError::Database(e.to_string()))?;
        self.db
            .put(Self::key(BODY_PREFIX, block.number(), hash), block.encode_body())
            .map_err(|e| ChainError::Database(e.to_string()))?;
        Ok(hash)
    }

    fn key(prefix: u8, number: u64, hash: B256) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + 8 + 32);
        key.push(prefix);
        key.extend_from_slice(&number.to_be_bytes());
        key.extend_from_slice(hash.as_slice());
        key
    }

    fn get(&self, key: Vec<u8>) -> ChainResult<Option<Vec<u8>>> {
        self.db.get(key).map_err(|e| ChainError::Database(e.to_string()))
    }
}

impl ChainAccessor for DiskChainDb {
    fn read_block(&self, hash: B256, number: u64) -> ChainResult<Option<Block>> {
        let Some(raw_header) = self.get(Self::key(HEADER_PREFIX, number, hash))? else {
            return Ok(None);
        };
        let Some(raw_body) = self.get(Self::key(BODY_PREFIX, number, hash))? else {
            return Ok(None);
        };
        let header = Header::decode(&mut raw_header.as_slice())?;
        let transactions = Block::decode_body(&raw_body)?;
        Ok(Some(Block::new(header, transactions)))
    }
}

impl Drop for DiskChainDb {
    fn drop(&mut self) {
        info!(target: "chain_db", "closing DB at {}", self.data_directory.display());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{test_utils::ChainBuilder, ChainIndexer};

    #[test]
    fn test_round_trip_blocks_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let chain = ChainBuilder::new().with_tx_counts(&[0, 2, 1]).build();

        {
            let db = DiskChainDb::open(dir.path()).unwrap();
            for block in chain.blocks() {
                db.insert(block).unwrap();
            }
        }

        let db = DiskChainDb::open_read_only(dir.path()).unwrap();
        for block in chain.blocks() {
            let read = db.block(block.hash(), block.number()).unwrap();
            assert_eq!(&read, block);
        }
    }

    #[test]
    fn test_missing_block_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = DiskChainDb::open(dir.path()).unwrap();
        assert_eq!(db.read_block(B256::ZERO, 7).unwrap(), None);
        assert_eq!(
            db.block(B256::ZERO, 7).unwrap_err(),
            ChainError::BlockNotFound { number: 7, hash: B256::ZERO }
        );
    }

    #[test]
    fn test_index_disk_chain() {
        let dir = tempfile::tempdir().unwrap();
        let chain = ChainBuilder::new().with_tx_counts(&[1, 0, 3, 0]).build();
        let db = DiskChainDb::open(dir.path()).unwrap();
        for block in chain.blocks() {
            db.insert(block).unwrap();
        }

        let head = chain.head();
        let index = ChainIndexer::new(&db).index(head.hash(), head.number()).unwrap();
        assert_eq!(index.ancestry, chain.hashes()[..3].to_vec());
        assert_eq!(index.transaction_count, 4);
    }
}
