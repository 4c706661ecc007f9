//! The producer half of a replay: turns the source history into [ReplayStep]s.

use crate::{
    encode_transaction, BeginBlockArgs, GenesisConfig, ReplayConfig, ReplayCursor, ReplayStep,
    Submission, SubmissionKind, BEGIN_BLOCK_METHOD, BEGIN_CHAIN_METHOD, SUBMIT_METHOD,
};
use alloy_primitives::{Bytes, B256};
use replay_chain::{Block, ChainAccessor};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

/// The consumer went away.
#[derive(Debug)]
struct QueueClosed;

/// Generates the replay steps of a source chain.
///
/// The generator reads blocks through a [ChainAccessor] and never talks to the target ledger.
#[derive(Debug)]
pub struct StepGenerator<A> {
    accessor: A,
    blocks: Vec<B256>,
    config: ReplayConfig,
    cursor: ReplayCursor,
    genesis: GenesisConfig,
}

impl<A> StepGenerator<A>
where
    A: ChainAccessor,
{
    /// Creates a new [StepGenerator].
    ///
    /// ## Takes
    /// - `accessor`: Read access to the source chain.
    /// - `blocks`: Block hashes in ascending height order, starting at genesis.
    /// - `config`: The [ReplayConfig] of the run.
    /// - `cursor`: The [ReplayCursor] bounding the replayed region.
    /// - `genesis`: The genesis state of the bootstrap step.
    pub const fn new(
        accessor: A,
        blocks: Vec<B256>,
        config: ReplayConfig,
        cursor: ReplayCursor,
        genesis: GenesisConfig,
    ) -> Self {
        Self { accessor, blocks, config, cursor, genesis }
    }

    /// Generates all steps into a vector.
    pub fn collect_steps(&self) -> Vec<ReplayStep> {
        let mut steps = Vec::new();
        let generated = self.generate(&mut |step| {
            steps.push(step);
            Ok(())
        });
        // Pushing to a vector never closes the queue.
        match generated {
            Ok(()) | Err(QueueClosed) => steps,
        }
    }

    /// Generates all steps into `sender`, blocking while the queue is full. Returns early if
    /// the receiver is dropped. The queue is closed when this returns.
    pub fn run(self, sender: mpsc::Sender<ReplayStep>) {
        let result = self.generate(&mut |step| sender.blocking_send(step).map_err(|_| QueueClosed));
        if result.is_err() {
            debug!(target: "generator", "consumer stopped, abandoning remaining steps");
        }
        debug!(target: "generator", "closing step queue");
    }

    /// Runs the generator on a blocking task feeding a queue of
    /// [ReplayConfig::queue_capacity] steps.
    ///
    /// ## Returns
    /// - The handle of the producer task and the receiving end of the queue.
    pub fn spawn(self) -> (JoinHandle<()>, mpsc::Receiver<ReplayStep>)
    where
        A: Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(self.config.queue_capacity());
        let handle = tokio::task::spawn_blocking(move || self.run(sender));
        (handle, receiver)
    }

    fn generate<F>(&self, emit: &mut F) -> Result<(), QueueClosed>
    where
        F: FnMut(ReplayStep) -> Result<(), QueueClosed>,
    {
        emit(self.bootstrap_step())?;

        for (number, hash) in self.blocks.iter().enumerate() {
            let number = number as u64;
            if self.cursor.breaks_at_block(number) {
                return emit(ReplayStep::Comment(format!("breaking block {number}")));
            }
            if self.cursor.skips_block(number) {
                emit(ReplayStep::Comment(format!("skipping block {number}")))?;
                continue;
            }

            let block = match self.accessor.block(*hash, number) {
                Ok(block) => block,
                Err(e) => return emit(ReplayStep::Error(e.into())),
            };

            if self.config.skip_empty_blocks && block.transactions().is_empty() {
                emit(ReplayStep::Comment(format!(
                    "begin_block() skipped for empty block {number}"
                )))?;
            } else {
                emit(Self::begin_block_step(&block))?;
            }

            for (index, tx) in block.transactions().iter().enumerate() {
                let index = index as u64;
                if self.cursor.breaks_at_tx(number, index) {
                    return emit(ReplayStep::Comment(format!(
                        "breaking at transaction {index} (in block {number})"
                    )));
                }
                if self.cursor.skips_tx(number, index) {
                    emit(ReplayStep::Comment(format!(
                        "skipping transaction {index} (in block {number})"
                    )))?;
                    continue;
                }

                let args = match encode_transaction(tx) {
                    Ok(args) => args,
                    Err(e) => return emit(ReplayStep::Error(e.into())),
                };
                let comment = format!(
                    "submit({number}, tx={index}, tx_size={}, gas={})",
                    args.len(),
                    self.config.batch_gas()
                );
                emit(ReplayStep::Submission(Submission {
                    kind: SubmissionKind::Transaction,
                    method_name: SUBMIT_METHOD.to_string(),
                    args,
                    comment: Some(comment),
                    source_tx: Some(tx.clone()),
                }))?;
            }
        }
        Ok(())
    }

    fn bootstrap_step(&self) -> ReplayStep {
        let network = self.genesis.network;
        ReplayStep::Submission(Submission {
            kind: SubmissionKind::Bootstrap,
            method_name: BEGIN_CHAIN_METHOD.to_string(),
            args: Bytes::from(alloy_rlp::encode(self.genesis.begin_chain_args())),
            comment: Some(format!(
                "{BEGIN_CHAIN_METHOD}(chain_id={}, genesis={})",
                network.chain_id(),
                network.genesis_hash()
            )),
            source_tx: None,
        })
    }

    fn begin_block_step(block: &Block) -> ReplayStep {
        ReplayStep::Submission(Submission {
            kind: SubmissionKind::BeginBlock,
            method_name: BEGIN_BLOCK_METHOD.to_string(),
            args: Bytes::from(alloy_rlp::encode(BeginBlockArgs::from(block))),
            comment: Some(format!("{BEGIN_BLOCK_METHOD}({})", block.number())),
            source_tx: None,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{BeginChainArgs, EncodingError, Network, ReplayError};
    use alloy_consensus::{SignableTransaction, TxEip7702, TxEnvelope};
    use alloy_primitives::Signature;
    use alloy_rlp::Decodable;
    use proptest::prelude::*;
    use replay_chain::{
        test_utils::{legacy_transaction, ChainBuilder, TestChain},
        ChainError, MemoryChainDb,
    };

    fn generator(
        chain: &TestChain,
        config: ReplayConfig,
        cursor: ReplayCursor,
    ) -> StepGenerator<MemoryChainDb> {
        StepGenerator::new(
            chain.db().clone(),
            chain.hashes(),
            config,
            cursor,
            GenesisConfig::new(Network::Goerli),
        )
    }

    fn comments(steps: &[ReplayStep]) -> Vec<&str> {
        steps.iter().filter_map(ReplayStep::as_comment).collect()
    }

    fn kinds(steps: &[ReplayStep]) -> Vec<SubmissionKind> {
        steps.iter().filter_map(ReplayStep::as_submission).map(|s| s.kind).collect()
    }

    #[test]
    fn test_full_replay_order() {
        let chain = ChainBuilder::new().with_tx_counts(&[0, 2, 0]).build();
        let steps = generator(&chain, ReplayConfig::new(Network::Goerli), Default::default())
            .collect_steps();

        assert_eq!(
            kinds(&steps),
            vec![
                SubmissionKind::Bootstrap,
                SubmissionKind::BeginBlock,
                SubmissionKind::BeginBlock,
                SubmissionKind::Transaction,
                SubmissionKind::Transaction,
                SubmissionKind::BeginBlock,
            ]
        );
        let txs = steps
            .iter()
            .filter_map(ReplayStep::as_submission)
            .filter_map(|s| s.source_tx.clone())
            .collect::<Vec<_>>();
        assert_eq!(txs, chain.blocks()[1].transactions().to_vec());
    }

    #[test]
    fn test_bootstrap_args() {
        let chain = ChainBuilder::new().with_tx_counts(&[0]).build();
        let steps = generator(&chain, ReplayConfig::new(Network::Goerli), Default::default())
            .collect_steps();
        let bootstrap = steps[0].as_submission().unwrap();
        assert_eq!(bootstrap.method_name, BEGIN_CHAIN_METHOD);
        let args = BeginChainArgs::decode(&mut bootstrap.args.as_ref()).unwrap();
        assert_eq!(args.chain_id, alloy_primitives::U256::from(5u64));
        assert!(args.genesis_alloc.is_empty());
    }

    #[test]
    fn test_submit_comment_and_args() {
        let chain = ChainBuilder::new().with_tx_counts(&[1]).build();
        let config = ReplayConfig::new(Network::Goerli).with_gas(1_000).with_batching(4);
        let steps = generator(&chain, config, Default::default()).collect_steps();
        let submit = steps.last().and_then(ReplayStep::as_submission).unwrap();
        let tx = &chain.blocks()[0].transactions()[0];
        let args = encode_transaction(tx).unwrap();
        assert_eq!(submit.method_name, SUBMIT_METHOD);
        assert_eq!(
            submit.comment.as_deref(),
            Some(format!("submit(0, tx=0, tx_size={}, gas=250)", args.len()).as_str())
        );
        assert_eq!(submit.args, args);
    }

    #[test]
    fn test_skip_empty_blocks() {
        let chain = ChainBuilder::new().with_tx_counts(&[0, 1]).build();
        let config = ReplayConfig::new(Network::Goerli).with_skip_empty_blocks(true);
        let steps = generator(&chain, config, Default::default()).collect_steps();
        assert_eq!(comments(&steps), vec!["begin_block() skipped for empty block 0"]);
        assert_eq!(
            kinds(&steps),
            vec![SubmissionKind::Bootstrap, SubmissionKind::BeginBlock, SubmissionKind::Transaction]
        );
    }

    #[test]
    fn test_start_cursor_replaces_prefix_with_comments() {
        let chain = ChainBuilder::new().with_tx_counts(&[0, 3]).build();
        let steps = generator(
            &chain,
            ReplayConfig::new(Network::Goerli),
            ReplayCursor::starting_at(1, 2),
        )
        .collect_steps();
        assert_eq!(
            comments(&steps),
            vec![
                "skipping block 0",
                "skipping transaction 0 (in block 1)",
                "skipping transaction 1 (in block 1)",
            ]
        );
        let submitted = steps
            .iter()
            .filter_map(ReplayStep::as_submission)
            .filter_map(|s| s.source_tx.clone())
            .collect::<Vec<_>>();
        assert_eq!(submitted, vec![chain.blocks()[1].transactions()[2].clone()]);
    }

    #[test]
    fn test_break_at_block() {
        let chain = ChainBuilder::new().with_tx_counts(&[0, 1, 1]).build();
        let cursor = ReplayCursor::default().with_break(2, 0);
        let steps = generator(&chain, ReplayConfig::new(Network::Goerli), cursor).collect_steps();
        assert_eq!(steps.last().and_then(ReplayStep::as_comment), Some("breaking block 2"));
        assert_eq!(kinds(&steps).len(), 4);
    }

    #[test]
    fn test_break_at_transaction() {
        let chain = ChainBuilder::new().with_tx_counts(&[0, 3, 1]).build();
        let cursor = ReplayCursor::default().with_break(1, 1);
        let steps = generator(&chain, ReplayConfig::new(Network::Goerli), cursor).collect_steps();
        assert_eq!(
            steps.last().and_then(ReplayStep::as_comment),
            Some("breaking at transaction 1 (in block 1)")
        );
        assert_eq!(
            kinds(&steps),
            vec![
                SubmissionKind::Bootstrap,
                SubmissionKind::BeginBlock,
                SubmissionKind::BeginBlock,
                SubmissionKind::Transaction,
            ]
        );
    }

    #[test]
    fn test_missing_block_terminates_with_error() {
        let chain = ChainBuilder::new().with_tx_counts(&[0, 1, 1]).build();
        let mut db = chain.db().clone();
        let missing = chain.blocks()[1].hash();
        db.remove(missing, 1);
        let generator = StepGenerator::new(
            db,
            chain.hashes(),
            ReplayConfig::new(Network::Goerli),
            ReplayCursor::default(),
            GenesisConfig::new(Network::Goerli),
        );
        let steps = generator.collect_steps();
        assert_eq!(
            steps.last(),
            Some(&ReplayStep::Error(ReplayError::Read(ChainError::BlockNotFound {
                number: 1,
                hash: missing,
            })))
        );
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn test_unsupported_transaction_terminates_with_error() {
        let unsupported = TxEnvelope::Eip7702(
            TxEip7702 { chain_id: 5, ..Default::default() }
                .into_signed(Signature::test_signature()),
        );
        let chain = ChainBuilder::new()
            .with_block(vec![legacy_transaction(0), unsupported, legacy_transaction(1)])
            .build();
        let steps = generator(&chain, ReplayConfig::new(Network::Goerli), Default::default())
            .collect_steps();
        assert_eq!(
            steps.last(),
            Some(&ReplayStep::Error(ReplayError::Encoding(
                EncodingError::UnsupportedTransactionType(4)
            )))
        );
        assert_eq!(kinds(&steps).len(), 3);
    }

    #[tokio::test]
    async fn test_spawn_streams_all_steps() {
        let chain = ChainBuilder::new().with_tx_counts(&[2, 5, 0, 7]).build();
        let config = ReplayConfig::new(Network::Goerli).with_batching(1);
        let expected = generator(&chain, config.clone(), Default::default()).collect_steps();

        let (handle, mut receiver) = generator(&chain, config, Default::default()).spawn();
        let mut received = Vec::new();
        while let Some(step) = receiver.recv().await {
            received.push(step);
        }
        handle.await.unwrap();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_spawn_stops_when_receiver_dropped() {
        let chain = ChainBuilder::new().with_tx_counts(&[20, 20]).build();
        let config = ReplayConfig::new(Network::Goerli).with_batching(1);
        let (handle, mut receiver) = generator(&chain, config, Default::default()).spawn();
        assert!(receiver.recv().await.is_some());
        drop(receiver);
        handle.await.unwrap();
    }

    proptest! {
        #[test]
        fn test_cursor_regions_emit_no_submissions(
            counts in proptest::collection::vec(0usize..4, 1..6),
            start_block in 0u64..6,
            start_tx in 0u64..4,
        ) {
            let chain = ChainBuilder::new().with_tx_counts(&counts).build();
            let cursor = ReplayCursor::starting_at(start_block, start_tx);
            let steps =
                generator(&chain, ReplayConfig::new(Network::Goerli), cursor).collect_steps();

            let mut expected = Vec::new();
            for (number, block) in chain.blocks().iter().enumerate() {
                for (index, tx) in block.transactions().iter().enumerate() {
                    if (number as u64, index as u64) >= (start_block, start_tx) {
                        expected.push(tx.clone());
                    }
                }
            }
            let submitted = steps
                .iter()
                .filter_map(ReplayStep::as_submission)
                .filter_map(|s| s.source_tx.clone())
                .collect::<Vec<_>>();
            prop_assert_eq!(submitted, expected);
        }

        #[test]
        fn test_break_suffix_emits_no_submissions(
            counts in proptest::collection::vec(0usize..4, 1..6),
            break_block in 1u64..7,
            break_tx in 0u64..6,
        ) {
            let chain = ChainBuilder::new().with_tx_counts(&counts).build();
            let cursor = ReplayCursor::default().with_break(break_block, break_tx);
            let steps =
                generator(&chain, ReplayConfig::new(Network::Goerli), cursor).collect_steps();

            let mut positions = Vec::new();
            for (number, block) in chain.blocks().iter().enumerate() {
                for (index, tx) in block.transactions().iter().enumerate() {
                    positions.push((tx.clone(), (number as u64, index as u64)));
                }
            }
            let submitted = steps
                .iter()
                .filter_map(ReplayStep::as_submission)
                .filter_map(|s| s.source_tx.clone())
                .collect::<Vec<_>>();
            let expected = positions
                .iter()
                .filter(|(_, position)| *position < (break_block, break_tx))
                .map(|(tx, _)| tx.clone())
                .collect::<Vec<_>>();
            prop_assert_eq!(submitted, expected);

            let begun = steps
                .iter()
                .filter_map(ReplayStep::as_submission)
                .filter(|s| s.kind == SubmissionKind::BeginBlock)
                .count() as u64;
            let expected_begun = if break_tx == 0 { break_block } else { break_block + 1 };
            prop_assert_eq!(begun, expected_begun.min(counts.len() as u64));
        }
    }

    #[test]
    fn test_break_past_block_end_stops_at_next_block() {
        let chain = ChainBuilder::new().with_tx_counts(&[0, 2, 1]).build();
        let cursor = ReplayCursor::default().with_break(1, 5);
        let steps = generator(&chain, ReplayConfig::new(Network::Goerli), cursor).collect_steps();
        assert_eq!(steps.last().and_then(ReplayStep::as_comment), Some("breaking block 2"));
        let submitted = steps
            .iter()
            .filter_map(ReplayStep::as_submission)
            .filter_map(|s| s.source_tx.clone())
            .collect::<Vec<_>>();
        assert_eq!(submitted, chain.blocks()[1].transactions().to_vec());
    }
}
