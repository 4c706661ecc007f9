//! Runs a replay: one producer task, one consumer, one bounded queue between them.

use crate::{
    BatchSubmitter, ConfigError, GenesisConfig, LedgerClient, ReplayConfig, ReplayCursor,
    ReplayError, ReplayResult, ReplaySummary, StepGenerator,
};
use alloy_primitives::B256;
use replay_chain::ChainAccessor;
use tracing::info;

/// Drives a replay of a source chain into a target contract.
#[derive(Debug)]
pub struct ReplayDriver<C> {
    submitter: BatchSubmitter<C>,
    config: ReplayConfig,
    cursor: ReplayCursor,
    genesis: GenesisConfig,
}

impl<C> ReplayDriver<C>
where
    C: LedgerClient + Send,
{
    /// Creates a new [ReplayDriver].
    ///
    /// ## Takes
    /// - `client`: The signed session against the target ledger.
    /// - `contract`: The account of the target contract.
    /// - `config`: The [ReplayConfig] of the run.
    /// - `cursor`: The [ReplayCursor] bounding the replayed region.
    /// - `genesis`: The genesis state of the bootstrap step.
    pub fn new(
        client: C,
        contract: impl Into<String>,
        config: ReplayConfig,
        cursor: ReplayCursor,
        genesis: GenesisConfig,
    ) -> Self {
        let submitter = BatchSubmitter::new(client, contract, config.clone());
        Self { submitter, config, cursor, genesis }
    }

    /// Returns the ledger client.
    pub const fn client(&self) -> &C {
        self.submitter.client()
    }

    /// Returns the ledger client mutably, for calls made outside the replay itself.
    pub fn client_mut(&mut self) -> &mut C {
        self.submitter.client_mut()
    }

    /// Consumes the driver, returning the ledger client.
    pub fn into_client(self) -> C {
        self.submitter.into_client()
    }

    /// Checks the run parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()?;
        self.cursor.validate()?;
        if self.genesis.network != self.config.network {
            return Err(ConfigError::Genesis(format!(
                "genesis of {} used to replay {}",
                self.genesis.network, self.config.network
            )));
        }
        Ok(())
    }

    /// Replays `blocks` and returns once every step was submitted or the first error occurred.
    ///
    /// The producer runs on a blocking task. Whatever the outcome, the queue is closed and the
    /// producer joined before this returns, releasing the accessor. The partial batch is only
    /// flushed once the producer finished cleanly.
    ///
    /// ## Takes
    /// - `accessor`: Read access to the source chain.
    /// - `blocks`: Block hashes in ascending height order, starting at genesis.
    ///
    /// ## Returns
    /// - `Ok(ReplaySummary)`: The run completed.
    /// - `Err(ReplayError)`: The first fatal error.
    pub async fn run<A>(&mut self, accessor: A, blocks: Vec<B256>) -> ReplayResult<ReplaySummary>
    where
        A: ChainAccessor + Send + 'static,
    {
        self.validate()?;

        let generator = StepGenerator::new(
            accessor,
            blocks,
            self.config.clone(),
            self.cursor,
            self.genesis.clone(),
        );
        let (producer, mut receiver) = generator.spawn();
        let drained = self.submitter.drain(&mut receiver).await;

        drop(receiver);
        let joined = producer.await;

        drained?;
        joined.map_err(|e| ReplayError::Producer(e.to_string()))?;
        self.submitter.flush().await?;

        let summary = self.submitter.summary();
        info!(
            target: "replayer",
            "replayed {} submissions in {} calls",
            summary.submissions,
            summary.calls
        );
        Ok(summary)
    }
}
