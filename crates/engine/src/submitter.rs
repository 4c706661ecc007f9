//! The consumer half of a replay: submits [ReplayStep]s to the target ledger.

use crate::{
    verify_outcome, FunctionCallAction, LedgerClient, ReplayConfig, ReplayError, ReplayResult,
    ReplayStep, Submission,
};
use std::mem;
use tokio::sync::mpsc;
use tracing::info;

/// Pending actions of a batched transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    actions: Vec<FunctionCallAction>,
    capacity: usize,
}

impl Batch {
    /// Creates an empty [Batch] holding at most `capacity` actions.
    pub fn new(capacity: usize) -> Self {
        Self { actions: Vec::with_capacity(capacity), capacity }
    }

    /// Appends an action.
    pub fn push(&mut self, action: FunctionCallAction) {
        self.actions.push(action);
    }

    /// Returns `true` if the batch holds `capacity` actions.
    pub fn is_full(&self) -> bool {
        self.actions.len() >= self.capacity
    }

    /// Returns `true` if the batch holds no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of pending actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Takes the pending actions, leaving the batch empty.
    pub fn take(&mut self) -> Vec<FunctionCallAction> {
        mem::replace(&mut self.actions, Vec::with_capacity(self.capacity))
    }
}

/// Counters of a finished replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Steps received.
    pub steps: u64,
    /// Comment steps received.
    pub comments: u64,
    /// Submission steps received.
    pub submissions: u64,
    /// Calls made against the target ledger.
    pub calls: u64,
}

/// Submits replay steps one at a time or grouped into batches.
#[derive(Debug)]
pub struct BatchSubmitter<C> {
    client: C,
    contract: String,
    config: ReplayConfig,
    batch: Batch,
    summary: ReplaySummary,
}

impl<C> BatchSubmitter<C>
where
    C: LedgerClient + Send,
{
    /// Creates a new [BatchSubmitter].
    ///
    /// ## Takes
    /// - `client`: The signed session against the target ledger.
    /// - `contract`: The account of the target contract.
    /// - `config`: The [ReplayConfig] of the run.
    pub fn new(client: C, contract: impl Into<String>, config: ReplayConfig) -> Self {
        let batch = Batch::new(config.batch_size);
        Self { client, contract: contract.into(), config, batch, summary: ReplaySummary::default() }
    }

    /// Returns the ledger client.
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Returns the ledger client mutably.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Consumes the submitter, returning the ledger client.
    pub fn into_client(self) -> C {
        self.client
    }

    /// Consumes steps until the queue is closed, then flushes the partial batch.
    ///
    /// ## Returns
    /// - `Ok(ReplaySummary)`: Every step was processed.
    /// - `Err(ReplayError)`: The first error step, or the first failed submission.
    pub async fn run(
        &mut self,
        receiver: &mut mpsc::Receiver<ReplayStep>,
    ) -> ReplayResult<ReplaySummary> {
        self.drain(receiver).await?;
        self.flush().await?;
        Ok(self.summary)
    }

    /// Consumes steps until the queue is closed, leaving the partial batch pending.
    pub async fn drain(&mut self, receiver: &mut mpsc::Receiver<ReplayStep>) -> ReplayResult<()> {
        self.summary = ReplaySummary::default();
        while let Some(step) = receiver.recv().await {
            self.process(step).await?;
        }
        Ok(())
    }

    /// Returns the counters of the current run.
    pub const fn summary(&self) -> ReplaySummary {
        self.summary
    }

    /// Processes a single step.
    pub async fn process(&mut self, step: ReplayStep) -> ReplayResult<()> {
        self.summary.steps += 1;
        match step {
            ReplayStep::Error(e) => Err(e),
            ReplayStep::Comment(text) => {
                self.summary.comments += 1;
                info!(target: "submitter", "{text}");
                Ok(())
            }
            ReplayStep::Submission(submission) => {
                self.summary.submissions += 1;
                if self.config.batch {
                    self.append(submission).await
                } else {
                    self.submit(submission).await
                }
            }
        }
    }

    /// Submits the pending actions, if any.
    pub async fn flush(&mut self) -> ReplayResult<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        info!(target: "submitter", "running last batch");
        self.submit_batch().await
    }

    async fn submit(&mut self, submission: Submission) -> ReplayResult<()> {
        if let Some(comment) = &submission.comment {
            info!(target: "submitter", "{comment}");
        }
        self.summary.calls += 1;
        let response = self
            .client
            .call_method(&self.contract, &submission.method_name, submission.args, self.config.gas, 0)
            .await
            .map_err(|e| ReplayError::Ledger(e.to_string()))?;
        verify_outcome(false, submission.source_tx.as_ref(), &response)?;
        Ok(())
    }

    async fn append(&mut self, submission: Submission) -> ReplayResult<()> {
        if let Some(comment) = &submission.comment {
            info!(target: "submitter", "batching: {comment}");
        }
        self.batch.push(FunctionCallAction {
            method_name: submission.method_name,
            args: submission.args,
            gas: self.config.batch_gas(),
            deposit: 0,
        });
        if self.batch.is_full() {
            info!(target: "submitter", "running batch");
            self.submit_batch().await?;
        }
        Ok(())
    }

    async fn submit_batch(&mut self) -> ReplayResult<()> {
        let actions = self.batch.take();
        self.summary.calls += 1;
        let response = self
            .client
            .submit_batch(&self.contract, actions)
            .await
            .map_err(|e| ReplayError::Ledger(e.to_string()))?;
        verify_outcome(true, None, &response)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        test_utils::{LedgerCall, TestLedgerClient},
        EncodingError, Network, SubmissionKind,
    };
    use alloy_primitives::Bytes;
    use proptest::prelude::*;

    const CONTRACT: &str = "evm.test.near";

    fn submission(n: u8) -> ReplayStep {
        ReplayStep::Submission(Submission {
            kind: SubmissionKind::Transaction,
            method_name: "submit".to_string(),
            args: Bytes::from(vec![n]),
            comment: None,
            source_tx: None,
        })
    }

    async fn feed(
        submitter: &mut BatchSubmitter<TestLedgerClient>,
        steps: Vec<ReplayStep>,
    ) -> ReplayResult<ReplaySummary> {
        let (sender, mut receiver) = mpsc::channel(steps.len().max(1));
        for step in steps {
            sender.send(step).await.unwrap();
        }
        drop(sender);
        submitter.run(&mut receiver).await
    }

    #[test]
    fn test_batch_take_resets() {
        let mut batch = Batch::new(2);
        assert!(batch.is_empty());
        batch.push(FunctionCallAction {
            method_name: "submit".to_string(),
            args: Bytes::new(),
            gas: 1,
            deposit: 0,
        });
        assert!(!batch.is_full());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.take().len(), 1);
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_unbatched_calls_with_full_gas() {
        let config = ReplayConfig::new(Network::Goerli).with_gas(900);
        let mut submitter = BatchSubmitter::new(TestLedgerClient::new(), CONTRACT, config);
        let steps = vec![submission(1), ReplayStep::Comment("note".to_string()), submission(2)];
        let summary = feed(&mut submitter, steps).await.unwrap();

        assert_eq!(summary, ReplaySummary { steps: 3, comments: 1, submissions: 2, calls: 2 });
        assert_eq!(
            submitter.client().calls(),
            &[
                LedgerCall::Single {
                    contract: CONTRACT.to_string(),
                    method_name: "submit".to_string(),
                    args: Bytes::from(vec![1]),
                    gas: 900,
                    deposit: 0,
                },
                LedgerCall::Single {
                    contract: CONTRACT.to_string(),
                    method_name: "submit".to_string(),
                    args: Bytes::from(vec![2]),
                    gas: 900,
                    deposit: 0,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_error_step_aborts_unchanged() {
        let mut submitter = BatchSubmitter::new(
            TestLedgerClient::new(),
            CONTRACT,
            ReplayConfig::new(Network::Goerli).with_batching(5),
        );
        let error = ReplayError::Encoding(EncodingError::UnsupportedTransactionType(3));
        let steps = vec![submission(1), ReplayStep::Error(error.clone()), submission(2)];
        assert_eq!(feed(&mut submitter, steps).await, Err(error));
        // The partial batch before the error is not flushed.
        assert!(submitter.client().calls().is_empty());
    }

    #[tokio::test]
    async fn test_failure_status_aborts() {
        let client = TestLedgerClient::new().fail_on_call(1);
        let mut submitter =
            BatchSubmitter::new(client, CONTRACT, ReplayConfig::new(Network::Goerli));
        let result = feed(&mut submitter, vec![submission(1), submission(2), submission(3)]).await;
        assert!(matches!(result, Err(ReplayError::SubmissionFailed(_))));
        assert_eq!(submitter.client().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_aborts() {
        let client = TestLedgerClient::new().disconnect_on_call(0);
        let mut submitter =
            BatchSubmitter::new(client, CONTRACT, ReplayConfig::new(Network::Goerli));
        let result = feed(&mut submitter, vec![submission(1)]).await;
        assert!(matches!(result, Err(ReplayError::Ledger(_))));
    }

    proptest! {
        #[test]
        fn test_batches_split_submissions(m in 0usize..40, n in 1usize..8) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let config = ReplayConfig::new(Network::Goerli).with_gas(8_000).with_batching(n);
            let mut submitter = BatchSubmitter::new(TestLedgerClient::new(), CONTRACT, config);
            let steps = (0..m).map(|i| submission(i as u8)).collect::<Vec<_>>();
            let summary = runtime.block_on(feed(&mut submitter, steps)).unwrap();

            let sizes = submitter
                .client()
                .calls()
                .iter()
                .map(|call| match call {
                    LedgerCall::Batch { actions, .. } => {
                        assert!(actions.iter().all(|a| a.gas == 8_000 / n as u64 && a.deposit == 0));
                        actions.len()
                    }
                    LedgerCall::Single { .. } => panic!("unexpected single call"),
                    LedgerCall::CreateAccount { .. } => panic!("unexpected create_account call"),
                })
                .collect::<Vec<_>>();
            prop_assert_eq!(sizes.len(), m.div_ceil(n));
            prop_assert_eq!(summary.calls as usize, m.div_ceil(n));
            if m > 0 {
                let last = if m % n == 0 { n } else { m % n };
                prop_assert_eq!(*sizes.last().unwrap(), last);
                prop_assert!(sizes[..sizes.len() - 1].iter().all(|size| *size == n));
            }
        }
    }
}
