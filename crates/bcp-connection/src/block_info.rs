//! Inclusion tracking for posted transactions.
//!
//! The handle holds a value that starts as `Pending` and moves to one
//! terminal state when the transaction shows up in a block. Readers can
//! peek at the current value, follow updates, or wait for a condition.

use crate::{ConnectionError, Subscription};
use bcp_types::{BlockInfo, TransactionRecord};
use tokio::sync::watch;

/// Observable inclusion state of one transaction.
#[derive(Clone)]
pub struct BlockInfoHandle {
	receiver: watch::Receiver<BlockInfo>,
}

impl BlockInfoHandle {
	/// Follows `watcher` until the first record arrives, then stops it.
	pub(crate) fn track(mut watcher: Subscription<TransactionRecord>) -> Self {
		let (sender, receiver) = watch::channel(BlockInfo::Pending);

		tokio::spawn(async move {
			tokio::select! {
				record = watcher.recv() => {
					if let Some(record) = record {
						let info = record.block_info();
						tracing::debug!(
							tx_id = %bcp_types::truncate_id(record.transaction_id().as_str()),
							height = record.height(),
							"Transaction included"
						);
						sender.send_if_modified(|current| {
							if current.is_pending() {
								*current = info;
								true
							} else {
								false
							}
						});
					}
				}
				_ = sender.closed() => {}
			}
			watcher.cancel();
		});

		Self { receiver }
	}

	/// A handle that is already in a terminal state.
	pub fn settled(info: BlockInfo) -> Self {
		let (_, receiver) = watch::channel(info);
		Self { receiver }
	}

	/// Current state.
	pub fn value(&self) -> BlockInfo {
		self.receiver.borrow().clone()
	}

	/// Receiver notified on every state change.
	pub fn updates(&self) -> watch::Receiver<BlockInfo> {
		self.receiver.clone()
	}

	/// Waits until the state satisfies `predicate`.
	///
	/// Fails with `SubscriptionClosed` if tracking stopped while the state
	/// still did not satisfy it.
	pub async fn wait_for<F>(&self, mut predicate: F) -> Result<BlockInfo, ConnectionError>
	where
		F: FnMut(&BlockInfo) -> bool,
	{
		let mut receiver = self.receiver.clone();
		let info = receiver
			.wait_for(|info| predicate(info))
			.await
			.map_err(|_| ConnectionError::SubscriptionClosed)?;
		Ok(info.clone())
	}

	/// Waits for the terminal state.
	pub async fn wait_for_inclusion(&self) -> Result<BlockInfo, ConnectionError> {
		self.wait_for(|info| !info.is_pending()).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_settled_handle_resolves_immediately() {
		let handle = BlockInfoHandle::settled(BlockInfo::Failed {
			height: 3,
			code: 13,
			message: "invalid amount".to_string(),
		});
		assert!(handle.value().is_failed());
		let info = handle.wait_for_inclusion().await.unwrap();
		assert!(matches!(info, BlockInfo::Failed { code: 13, .. }));
	}

	#[tokio::test]
	async fn test_unsatisfiable_wait_reports_closed() {
		let handle = BlockInfoHandle::settled(BlockInfo::Pending);
		let result = handle.wait_for(|info| info.is_succeeded()).await;
		assert!(matches!(result, Err(ConnectionError::SubscriptionClosed)));
	}
}
