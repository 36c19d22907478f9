// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Transaction store and slip status ports.
//!
//! The workflow talks to its data layer only through [`TransactionStore`] and
//! [`SlipStatusQuery`]. [`InMemoryTransactionStore`] and [`InMemorySlipStatus`]
//! implement them for the command-line driver and for tests.
//!
//! # Propagation lag
//!
//! The in-memory store keeps two views: a *source of truth* and the
//! *published* snapshot that readers see. [`InMemoryTransactionStore::stage`]
//! writes only to the source of truth; a later [`TransactionStore::refresh`]
//! publishes it, optionally after a propagation delay.

use crate::DispenseError;
use crate::base::TransactionId;
use crate::transaction::{FuelTransaction, SlipStatus, TransactionStatus};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

pub type Snapshot = Arc<Vec<FuelTransaction>>;

/// Reactive source of fuel transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Current in-memory list of transactions.
    fn transactions(&self) -> Snapshot;

    /// Receiver notified whenever the list changes.
    fn subscribe(&self) -> watch::Receiver<Snapshot>;

    /// Forces a refresh from the source of truth.
    ///
    /// Completion does not guarantee the new data is already visible through
    /// [`TransactionStore::transactions`].
    async fn refresh(&self) -> Result<(), DispenseError>;

    /// Marks the transaction as dispensed and returns the updated record.
    async fn confirm_dispensed(&self, id: &TransactionId)
    -> Result<FuelTransaction, DispenseError>;
}

/// Cancellation state lookup for the gas slip attached to a transaction.
#[async_trait]
pub trait SlipStatusQuery: Send + Sync {
    async fn slip_status(&self, id: &TransactionId) -> Result<SlipStatus, DispenseError>;
}

#[async_trait]
impl<T: TransactionStore + ?Sized> TransactionStore for Arc<T> {
    fn transactions(&self) -> Snapshot {
        (**self).transactions()
    }

    fn subscribe(&self) -> watch::Receiver<Snapshot> {
        (**self).subscribe()
    }

    async fn refresh(&self) -> Result<(), DispenseError> {
        (**self).refresh().await
    }

    async fn confirm_dispensed(
        &self,
        id: &TransactionId,
    ) -> Result<FuelTransaction, DispenseError> {
        (**self).confirm_dispensed(id).await
    }
}

#[async_trait]
impl<T: SlipStatusQuery + ?Sized> SlipStatusQuery for Arc<T> {
    async fn slip_status(&self, id: &TransactionId) -> Result<SlipStatus, DispenseError> {
        (**self).slip_status(id).await
    }
}

#[derive(Debug)]
struct StoreInner {
    /// Source of truth indexed by transaction ID.
    source: DashMap<TransactionId, FuelTransaction>,
    /// Snapshot visible to readers.
    published: watch::Sender<Snapshot>,
    /// Delay between a refresh request and the snapshot being published.
    propagation_delay: Option<Duration>,
    offline: AtomicBool,
    refresh_count: AtomicUsize,
}

impl StoreInner {
    fn publish(&self) {
        let mut transactions: Vec<FuelTransaction> =
            self.source.iter().map(|entry| entry.value().clone()).collect();
        transactions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.0.cmp(&b.id.0)));
        self.published.send_replace(Arc::new(transactions));
    }
}

/// In-memory [`TransactionStore`] with an explicit propagation step.
///
/// Cloning is cheap and every clone shares the same data.
#[derive(Debug, Clone)]
pub struct InMemoryTransactionStore {
    inner: Arc<StoreInner>,
}

impl InMemoryTransactionStore {
    /// Creates a store whose refreshes publish immediately.
    pub fn new() -> Self {
        Self::with_propagation_delay(None)
    }

    /// Creates a store whose refreshes publish after `delay`.
    pub fn with_propagation_delay(delay: Option<Duration>) -> Self {
        let (published, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(StoreInner {
                source: DashMap::new(),
                published,
                propagation_delay: delay,
                offline: AtomicBool::new(false),
                refresh_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Inserts or replaces a transaction and publishes it right away.
    pub fn insert(&self, transaction: FuelTransaction) {
        self.inner.source.insert(transaction.id.clone(), transaction);
        self.inner.publish();
    }

    /// Writes a transaction to the source of truth without publishing it.
    pub fn stage(&self, transaction: FuelTransaction) {
        self.inner.source.insert(transaction.id.clone(), transaction);
    }

    /// Makes subsequent refreshes fail with [`DispenseError::Store`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of refresh requests received, including failed ones.
    pub fn refresh_count(&self) -> usize {
        self.inner.refresh_count.load(Ordering::SeqCst)
    }

    /// Reads a transaction straight from the source of truth.
    pub fn get(&self, id: &TransactionId) -> Option<FuelTransaction> {
        self.inner.source.get(id).map(|entry| entry.value().clone())
    }
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    fn transactions(&self) -> Snapshot {
        self.inner.published.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.published.subscribe()
    }

    async fn refresh(&self) -> Result<(), DispenseError> {
        self.inner.refresh_count.fetch_add(1, Ordering::SeqCst);
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(DispenseError::Store("store is offline".to_string()));
        }

        match self.inner.propagation_delay {
            None => self.inner.publish(),
            Some(delay) => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.publish();
                });
            }
        }
        debug!(delay = ?self.inner.propagation_delay, "store refresh requested");
        Ok(())
    }

    async fn confirm_dispensed(
        &self,
        id: &TransactionId,
    ) -> Result<FuelTransaction, DispenseError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(DispenseError::Store("store is offline".to_string()));
        }

        // Guard must be released before publishing, which iterates the map.
        let updated = {
            let mut entry = self
                .inner
                .source
                .get_mut(id)
                .ok_or_else(|| DispenseError::Store(format!("unknown transaction id {id}")))?;
            if !entry.status.is_dispensable() {
                return Err(DispenseError::NotDispensable {
                    reference: entry.reference_number.clone(),
                    status: entry.status,
                });
            }
            entry.status = TransactionStatus::Dispensed;
            entry.value().clone()
        };

        self.inner.publish();
        Ok(updated)
    }
}

/// In-memory [`SlipStatusQuery`] backed by raw status strings.
///
/// Transactions without a recorded slip status report `ACTIVE`.
#[derive(Debug, Default)]
pub struct InMemorySlipStatus {
    statuses: RwLock<HashMap<TransactionId, String>>,
    unavailable: AtomicBool,
}

impl InMemorySlipStatus {
    const DEFAULT_STATUS: &'static str = "ACTIVE";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, id: TransactionId, status: impl Into<String>) {
        self.statuses.write().insert(id, status.into());
    }

    /// Makes subsequent queries fail with [`DispenseError::SlipQuery`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl SlipStatusQuery for InMemorySlipStatus {
    async fn slip_status(&self, id: &TransactionId) -> Result<SlipStatus, DispenseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DispenseError::SlipQuery(format!(
                "slip service unavailable for {id}"
            )));
        }
        let statuses = self.statuses.read();
        let raw = statuses
            .get(id)
            .map(String::as_str)
            .unwrap_or(Self::DEFAULT_STATUS);
        Ok(SlipStatus::from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{ReferenceNumber, VehicleId};
    use crate::transaction::FuelType;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    fn make_transaction(id: &str, reference: &str, created: i64) -> FuelTransaction {
        FuelTransaction {
            id: TransactionId(id.into()),
            reference_number: ReferenceNumber(reference.into()),
            vehicle_id: VehicleId("AMB-01".into()),
            driver_name: "J. Santos".into(),
            fuel_type: FuelType::Gasoline,
            liters_to_pump: dec!(20),
            status: TransactionStatus::Pending,
            created_at: DateTime::<Utc>::from_timestamp(created, 0).unwrap(),
        }
    }

    #[test]
    fn insert_publishes_sorted_by_creation() {
        let store = InMemoryTransactionStore::new();
        store.insert(make_transaction("b", "R-2", 200));
        store.insert(make_transaction("a", "R-1", 100));

        let snapshot = store.transactions();
        let ids: Vec<_> = snapshot.iter().map(|t| t.id.0.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn staged_transaction_visible_only_after_refresh() {
        let store = InMemoryTransactionStore::new();
        store.stage(make_transaction("a", "R-1", 100));
        assert!(store.transactions().is_empty());

        store.refresh().await.unwrap();
        assert_eq!(store.transactions().len(), 1);
        assert_eq!(store.refresh_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_refresh_publishes_after_delay() {
        let store = InMemoryTransactionStore::with_propagation_delay(Some(Duration::from_secs(1)));
        store.stage(make_transaction("a", "R-1", 100));
        store.refresh().await.unwrap();
        assert!(store.transactions().is_empty());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.transactions().len(), 1);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let store = InMemoryTransactionStore::new();
        let mut rx = store.subscribe();
        store.insert(make_transaction("a", "R-1", 100));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[tokio::test]
    async fn offline_refresh_fails() {
        let store = InMemoryTransactionStore::new();
        store.set_offline(true);
        assert_eq!(
            store.refresh().await,
            Err(DispenseError::Store("store is offline".into()))
        );
        assert_eq!(store.refresh_count(), 1);
    }

    #[tokio::test]
    async fn confirm_dispensed_transitions_once() {
        let store = InMemoryTransactionStore::new();
        store.insert(make_transaction("a", "R-1", 100));
        let id = TransactionId("a".into());

        let updated = store.confirm_dispensed(&id).await.unwrap();
        assert_eq!(updated.status, TransactionStatus::Dispensed);
        assert_eq!(store.transactions()[0].status, TransactionStatus::Dispensed);

        let again = store.confirm_dispensed(&id).await;
        assert_eq!(
            again,
            Err(DispenseError::NotDispensable {
                reference: ReferenceNumber("R-1".into()),
                status: TransactionStatus::Dispensed,
            })
        );
    }

    #[tokio::test]
    async fn confirm_unknown_id_fails() {
        let store = InMemoryTransactionStore::new();
        let result = store.confirm_dispensed(&TransactionId("nope".into())).await;
        assert!(matches!(result, Err(DispenseError::Store(_))));
    }

    #[tokio::test]
    async fn slip_status_defaults_to_active() {
        let slips = InMemorySlipStatus::new();
        let id = TransactionId("a".into());
        assert_eq!(
            slips.slip_status(&id).await,
            Ok(SlipStatus::Other("ACTIVE".into()))
        );

        slips.set(id.clone(), "CANCELLED");
        assert_eq!(slips.slip_status(&id).await, Ok(SlipStatus::Cancelled));
    }

    #[tokio::test]
    async fn unavailable_slip_service_fails() {
        let slips = InMemorySlipStatus::new();
        slips.set_unavailable(true);
        let result = slips.slip_status(&TransactionId("a".into())).await;
        assert!(matches!(result, Err(DispenseError::SlipQuery(_))));
    }
}
