//! Subscriptions built on the transport's event streams.
//!
//! Every subscription owns a forwarding task and a cancel handle. Handles
//! are tracked in a registry owned by the connection, so disconnecting
//! cancels whatever is still running. Cancelling is idempotent and also
//! happens when the subscription is dropped.

use crate::connection::{decode_tx_response, ChainConnection};
use crate::tags::{cash_tag, nonce_tag, swap_query_tag};
use crate::{ConnectionError, TransportQuery, TransportSubscriptionId};
use bcp_types::{
	truncate_id, Account, AccountQuery, AtomicSwap, Nonce, SwapId, SwapQuery, TransactionId,
	TransactionRecord, TxQuery,
};
use dashmap::DashMap;
use futures::Stream;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

/// Identifier of a subscription within one connection.
pub type SubscriptionId = u64;

#[derive(Clone)]
struct CancelHandle {
	id: SubscriptionId,
	cancelled: Arc<AtomicBool>,
	stop: Arc<Mutex<Option<oneshot::Sender<()>>>>,
	registry: Weak<SubscriptionRegistry>,
}

impl CancelHandle {
	/// Returns `true` only for the call that actually cancelled.
	fn cancel(&self) -> bool {
		if self.cancelled.swap(true, Ordering::SeqCst) {
			return false;
		}
		if let Some(stop) = self.stop.lock().take() {
			let _ = stop.send(());
		}
		self.release();
		true
	}

	fn release(&self) {
		if let Some(registry) = self.registry.upgrade() {
			registry.entries.remove(&self.id);
		}
	}

	fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

/// Live subscriptions of one connection.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
	next_id: AtomicU64,
	entries: DashMap<SubscriptionId, CancelHandle>,
}

impl SubscriptionRegistry {
	fn next_id(&self) -> SubscriptionId {
		self.next_id.fetch_add(1, Ordering::SeqCst)
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	/// Cancels every registered subscription and returns how many there were.
	pub(crate) fn cancel_all(&self) -> usize {
		// Collect first: cancelling removes entries from the map.
		let handles: Vec<CancelHandle> = self.entries.iter().map(|e| e.value().clone()).collect();
		handles.iter().filter(|handle| handle.cancel()).count()
	}
}

/// A lazily consumed, unbounded sequence of events.
///
/// Implements [`Stream`]; [`Subscription::recv`] is a shortcut for
/// consumers that do not use stream combinators.
pub struct Subscription<T> {
	id: SubscriptionId,
	receiver: mpsc::UnboundedReceiver<T>,
	handle: CancelHandle,
}

impl<T> Subscription<T> {
	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	/// Next event, or `None` once the subscription ended or was cancelled.
	pub async fn recv(&mut self) -> Option<T> {
		if self.handle.is_cancelled() {
			return None;
		}
		let item = self.receiver.recv().await;
		if self.handle.is_cancelled() {
			return None;
		}
		item
	}

	/// Stops delivery and releases the transport subscription.
	///
	/// Cancelling more than once is a no-op.
	pub fn cancel(&self) {
		if self.handle.cancel() {
			tracing::debug!(subscription = self.id, "Subscription cancelled");
		}
	}

	pub fn is_cancelled(&self) -> bool {
		self.handle.is_cancelled()
	}
}

impl<T> Unpin for Subscription<T> {}

impl<T> Stream for Subscription<T> {
	type Item = T;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
		if self.handle.is_cancelled() {
			return Poll::Ready(None);
		}
		self.receiver.poll_recv(cx)
	}
}

impl<T> Drop for Subscription<T> {
	fn drop(&mut self) {
		self.handle.cancel();
	}
}

impl ChainConnection {
	/// Number of subscriptions that have not ended or been cancelled.
	pub fn active_subscriptions(&self) -> usize {
		self.subscriptions.len()
	}

	/// Runs `producer` until it finishes or the subscription is cancelled,
	/// then releases the transport subscription.
	fn spawn_subscription<T, F, Fut>(
		&self,
		transport_id: Option<TransportSubscriptionId>,
		producer: F,
	) -> Subscription<T>
	where
		T: Send + 'static,
		F: FnOnce(mpsc::UnboundedSender<T>) -> Fut,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let (sender, receiver) = mpsc::unbounded_channel();
		let (stop_tx, stop_rx) = oneshot::channel();
		let id = self.subscriptions.next_id();
		let handle = CancelHandle {
			id,
			cancelled: Arc::new(AtomicBool::new(false)),
			stop: Arc::new(Mutex::new(Some(stop_tx))),
			registry: Arc::downgrade(&self.subscriptions),
		};
		self.subscriptions.entries.insert(id, handle.clone());

		let work = producer(sender);
		let transport = self.transport.clone();
		let task_handle = handle.clone();
		tokio::spawn(async move {
			tokio::select! {
				_ = work => {
					tracing::debug!(subscription = id, "Subscription source ended");
				}
				_ = stop_rx => {}
			}
			if let Some(transport_id) = transport_id {
				if let Err(e) = transport.unsubscribe(transport_id).await {
					tracing::warn!(subscription = id, "Failed to release transport subscription: {}", e);
				}
			}
			task_handle.release();
		});

		tracing::debug!(subscription = id, "Subscription started");
		Subscription {
			id,
			receiver,
			handle,
		}
	}

	/// Future transactions matching the query. History is not replayed.
	///
	/// The transport subscription is active when this returns, so nothing
	/// committed afterwards is missed.
	pub async fn listen_tx(&self, query: &TxQuery) -> Result<Subscription<TransactionRecord>, ConnectionError> {
		self.ensure_connected()?;
		let transport_query = self.transport_query(query)?;
		let (transport_id, mut events) = self.transport.subscribe_txs(&transport_query).await?;
		let chain_id = self.chain_id().clone();

		Ok(self.spawn_subscription(Some(transport_id), move |sender| async move {
			while let Some(event) = events.recv().await {
				match decode_tx_response(&chain_id, event) {
					Ok(record) => {
						if sender.send(record).is_err() {
							break;
						}
					},
					Err(e) => tracing::warn!("Dropping undecodable transaction: {}", e),
				}
			}
		}))
	}

	/// Historical matches followed by future ones, each delivered once.
	///
	/// The live stream is opened before history is read. A transaction
	/// committed between the two shows up in both and is emitted only the
	/// first time.
	pub async fn live_tx(&self, query: &TxQuery) -> Result<Subscription<TransactionRecord>, ConnectionError> {
		self.ensure_connected()?;
		let transport_query = self.transport_query(query)?;
		let (transport_id, mut events) = self.transport.subscribe_txs(&transport_query).await?;

		let history = match self.search_tx(query).await {
			Ok(history) => history,
			Err(e) => {
				let _ = self.transport.unsubscribe(transport_id).await;
				return Err(e);
			},
		};
		let chain_id = self.chain_id().clone();

		Ok(self.spawn_subscription(Some(transport_id), move |sender| async move {
			let mut seen: HashSet<TransactionId> = HashSet::new();
			for record in history {
				seen.insert(record.transaction_id().clone());
				if sender.send(record).is_err() {
					return;
				}
			}

			while let Some(event) = events.recv().await {
				if !seen.insert(event.hash.clone()) {
					tracing::trace!(tx_id = %truncate_id(event.hash.as_str()), "Skipping duplicate");
					continue;
				}
				match decode_tx_response(&chain_id, event) {
					Ok(record) => {
						if sender.send(record).is_err() {
							break;
						}
					},
					Err(e) => tracing::warn!("Dropping undecodable transaction: {}", e),
				}
			}
		}))
	}

	/// Current account state, then every change to it.
	///
	/// A missing account is emitted as `None`.
	pub async fn watch_account(
		&self,
		query: &AccountQuery,
	) -> Result<Subscription<Option<Account>>, ConnectionError> {
		self.ensure_connected()?;
		let address = self.address_of(query)?;
		let (transport_id, mut events) = self
			.transport
			.subscribe_txs(&TransportQuery::with_tag(cash_tag(&address)?))
			.await?;
		let current = self.get_account(query).await?;
		let reader = self.reader();
		let query = query.clone();

		Ok(self.spawn_subscription(Some(transport_id), move |sender| async move {
			let mut last = current;
			if sender.send(last.clone()).is_err() {
				return;
			}
			while events.recv().await.is_some() {
				while events.try_recv().is_ok() {}
				match reader.account(&query).await {
					Ok(account) if account != last => {
						last = account.clone();
						if sender.send(account).is_err() {
							break;
						}
					},
					Ok(_) => {},
					Err(e) => tracing::warn!("Failed to refresh account: {}", e),
				}
			}
		}))
	}

	/// Current nonce, then every change to it.
	pub async fn watch_nonce(&self, query: &AccountQuery) -> Result<Subscription<Nonce>, ConnectionError> {
		self.ensure_connected()?;
		let address = self.address_of(query)?;
		let (transport_id, mut events) = self
			.transport
			.subscribe_txs(&TransportQuery::with_tag(nonce_tag(&address)?))
			.await?;
		let current = self.get_nonce(query).await?;
		let reader = self.reader();

		Ok(self.spawn_subscription(Some(transport_id), move |sender| async move {
			let mut last = current;
			if sender.send(last).is_err() {
				return;
			}
			while events.recv().await.is_some() {
				while events.try_recv().is_ok() {}
				match reader.nonce(&address).await {
					Ok(nonce) if nonce != last => {
						last = nonce;
						if sender.send(nonce).is_err() {
							break;
						}
					},
					Ok(_) => {},
					Err(e) => tracing::warn!("Failed to refresh nonce: {}", e),
				}
			}
		}))
	}

	/// Every matching swap now, then each swap again whenever its state changes.
	pub async fn watch_swaps(&self, query: &SwapQuery) -> Result<Subscription<AtomicSwap>, ConnectionError> {
		self.ensure_connected()?;
		let (transport_id, mut events) = self
			.transport
			.subscribe_txs(&TransportQuery::with_tag(swap_query_tag(query)?))
			.await?;
		let current = self.get_swaps(query).await?;
		let reader = self.reader();
		let query = query.clone();

		Ok(self.spawn_subscription(Some(transport_id), move |sender| async move {
			let mut known: HashMap<SwapId, AtomicSwap> = HashMap::new();
			for swap in current {
				known.insert(swap.data.id.clone(), swap.clone());
				if sender.send(swap).is_err() {
					return;
				}
			}
			while events.recv().await.is_some() {
				while events.try_recv().is_ok() {}
				let swaps = match reader.swaps(&query).await {
					Ok(swaps) => swaps,
					Err(e) => {
						tracing::warn!("Failed to refresh swaps: {}", e);
						continue;
					},
				};
				for swap in swaps {
					if known.get(&swap.data.id) == Some(&swap) {
						continue;
					}
					known.insert(swap.data.id.clone(), swap.clone());
					if sender.send(swap).is_err() {
						return;
					}
				}
			}
		}))
	}

	/// Height of every new block.
	pub async fn watch_block_heights(&self) -> Result<Subscription<u64>, ConnectionError> {
		self.ensure_connected()?;
		let (transport_id, mut heights) = self.transport.subscribe_heights().await?;

		Ok(self.spawn_subscription(Some(transport_id), move |sender| async move {
			while let Some(height) = heights.recv().await {
				if sender.send(height).is_err() {
					break;
				}
			}
		}))
	}
}
