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

//! Dispense confirmation workflow.
//!
//! The [`DispenseController`] turns decoder payloads into a confirmed
//! dispense. Each scan walks the following states:
//!
//! ```text
//! Idle ──scan──► Parsing ──fail──► Error
//!                   │
//!                   ▼
//!               LookingUp ──absent (after refresh + wait)──► Error
//!                   │
//!                   ▼
//!           CheckingSlipStatus ──CANCELLED──► CancelledDialog
//!                   │
//!                   ▼
//!          AwaitingConfirmation ──dismiss──► Idle
//!                   │ confirm
//!                   ▼
//!               Confirming ──► Success | Error
//! ```
//!
//! `Success`, `Error` and `CancelledDialog` stay on screen until acknowledged,
//! which returns the controller to `Idle`.
//!
//! # Lookup
//!
//! Matching is exact and case-sensitive on the trimmed reference number. When
//! nothing matches, the store is asked to refresh, the controller waits a fixed
//! [`WorkflowConfig::refresh_wait`] and searches exactly once more.
//!
//! # Concurrency
//!
//! Events are processed one at a time. [`DispenseController::run`] drains an
//! event channel sequentially; observers follow the state through
//! [`DispenseController::subscribe`].

use crate::DispenseError;
use crate::base::ReferenceNumber;
use crate::debounce::ScanDebouncer;
use crate::qr;
use crate::store::{SlipStatusQuery, TransactionStore};
use crate::transaction::{FuelTransaction, ScannedTransaction, SlipStatus};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Timing knobs of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Fixed wait between a forced store refresh and the single re-lookup.
    pub refresh_wait: Duration,
    /// Identical decoder payloads inside this window are dropped.
    pub debounce_window: Duration,
}

impl WorkflowConfig {
    pub const DEFAULT_REFRESH_WAIT: Duration = Duration::from_secs(2);
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            refresh_wait: Self::DEFAULT_REFRESH_WAIT,
            debounce_window: ScanDebouncer::DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispenseState {
    Idle,
    Parsing,
    LookingUp { reference: ReferenceNumber },
    CheckingSlipStatus { transaction: FuelTransaction },
    AwaitingConfirmation { transaction: FuelTransaction },
    Confirming { transaction: FuelTransaction },
    Success { transaction: FuelTransaction },
    Error { error: DispenseError },
    CancelledDialog { transaction: FuelTransaction },
}

impl DispenseState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Parsing => "parsing",
            Self::LookingUp { .. } => "looking_up",
            Self::CheckingSlipStatus { .. } => "checking_slip_status",
            Self::AwaitingConfirmation { .. } => "awaiting_confirmation",
            Self::Confirming { .. } => "confirming",
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
            Self::CancelledDialog { .. } => "cancelled_dialog",
        }
    }

    /// States that stay on screen until the operator acknowledges them.
    pub fn needs_acknowledgement(&self) -> bool {
        matches!(
            self,
            Self::Success { .. } | Self::Error { .. } | Self::CancelledDialog { .. }
        )
    }

    /// The error to surface for this state, if any.
    pub fn error(&self) -> Option<DispenseError> {
        match self {
            Self::Error { error } => Some(error.clone()),
            Self::CancelledDialog { transaction } => {
                Some(DispenseError::Cancelled(transaction.reference_number.clone()))
            }
            _ => None,
        }
    }
}

/// Operator and decoder intents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispenseEvent {
    /// Raw payload emitted by the barcode decoder.
    Scanned(String),
    Confirm,
    Dismiss,
    Acknowledge,
}

/// Exact, case-sensitive search on the trimmed reference number.
pub fn lookup<'a>(
    transactions: &'a [FuelTransaction],
    scanned: &ScannedTransaction,
) -> Option<&'a FuelTransaction> {
    let reference = ReferenceNumber::normalized(scanned.reference_number.as_str());
    transactions.iter().find(|t| t.matches(&reference))
}

/// Drives a scan from decoder payload to confirmed dispense.
pub struct DispenseController<S, Q> {
    store: S,
    slips: Q,
    config: WorkflowConfig,
    state: watch::Sender<DispenseState>,
    debouncer: ScanDebouncer,
}

impl<S, Q> DispenseController<S, Q>
where
    S: TransactionStore,
    Q: SlipStatusQuery,
{
    pub fn new(store: S, slips: Q, config: WorkflowConfig) -> Self {
        let (state, _) = watch::channel(DispenseState::Idle);
        Self {
            store,
            slips,
            config,
            state,
            debouncer: ScanDebouncer::new(config.debounce_window),
        }
    }

    pub fn state(&self) -> DispenseState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<DispenseState> {
        self.state.subscribe()
    }

    /// Processes a single event and returns the resulting state.
    ///
    /// Events the current state does not accept are ignored.
    pub async fn handle(&mut self, event: DispenseEvent) -> DispenseState {
        match event {
            DispenseEvent::Scanned(raw) => self.on_scan(&raw).await,
            DispenseEvent::Confirm => self.on_confirm().await,
            DispenseEvent::Dismiss => self.on_dismiss(),
            DispenseEvent::Acknowledge => self.on_acknowledge(),
        }
        self.state()
    }

    /// Feeds a decoder payload through the debouncer before handling it.
    ///
    /// Returns `false` if the payload was dropped, either as a repeat or
    /// because a previous scan is still on screen. Only processed scans are
    /// recorded by the debouncer.
    pub async fn decoded(&mut self, raw: String) -> bool {
        if *self.state.borrow() != DispenseState::Idle {
            self.ignore("scanned");
            return false;
        }
        if !self.debouncer.accept(&raw, Instant::now()) {
            debug!(payload = %raw, "dropping repeated scan");
            return false;
        }
        self.handle(DispenseEvent::Scanned(raw)).await;
        true
    }

    /// Processes events in arrival order until the channel closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<DispenseEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                DispenseEvent::Scanned(raw) => {
                    self.decoded(raw).await;
                }
                other => {
                    self.handle(other).await;
                }
            }
        }
        debug!("event channel closed, dispense workflow stopped");
    }

    fn transition(&self, next: DispenseState) {
        info!(from = self.state.borrow().name(), to = next.name(), "dispense state transition");
        self.state.send_replace(next);
    }

    fn fail(&self, error: DispenseError) {
        warn!(%error, "dispense workflow error");
        self.transition(DispenseState::Error { error });
    }

    fn ignore(&self, event: &str) {
        debug!(event, state = self.state.borrow().name(), "ignoring event");
    }

    async fn on_scan(&mut self, raw: &str) {
        if *self.state.borrow() != DispenseState::Idle {
            self.ignore("scanned");
            return;
        }

        self.transition(DispenseState::Parsing);
        let scanned = match qr::parse(raw) {
            Ok(scanned) => scanned,
            Err(error) => return self.fail(error),
        };

        info!(reference = %scanned.reference_number, "scanned gas slip");
        self.transition(DispenseState::LookingUp {
            reference: scanned.reference_number.clone(),
        });
        let transaction = match self.find_with_retry(&scanned).await {
            Ok(transaction) => transaction,
            Err(error) => return self.fail(error),
        };

        self.transition(DispenseState::CheckingSlipStatus {
            transaction: transaction.clone(),
        });
        match self.slips.slip_status(&transaction.id).await {
            Ok(SlipStatus::Cancelled) => {
                warn!(reference = %transaction.reference_number, "gas slip is cancelled");
                self.transition(DispenseState::CancelledDialog { transaction });
            }
            Ok(SlipStatus::Other(status)) => {
                debug!(%status, "slip status allows dispensing");
                self.transition(DispenseState::AwaitingConfirmation { transaction });
            }
            Err(error) => self.fail(error),
        }
    }

    /// Looks the reference up, forcing one refresh and a fixed wait on a miss.
    async fn find_with_retry(
        &self,
        scanned: &ScannedTransaction,
    ) -> Result<FuelTransaction, DispenseError> {
        if let Some(found) = lookup(&self.store.transactions(), scanned) {
            return Ok(found.clone());
        }

        info!(
            reference = %scanned.reference_number,
            wait = ?self.config.refresh_wait,
            "reference not found, refreshing store"
        );
        if let Err(error) = self.store.refresh().await {
            warn!(%error, "store refresh failed, retrying lookup anyway");
        }
        tokio::time::sleep(self.config.refresh_wait).await;

        lookup(&self.store.transactions(), scanned)
            .cloned()
            .ok_or_else(|| DispenseError::NotFound(scanned.reference_number.clone()))
    }

    async fn on_confirm(&mut self) {
        let DispenseState::AwaitingConfirmation { transaction } = self.state() else {
            return self.ignore("confirm");
        };

        self.transition(DispenseState::Confirming {
            transaction: transaction.clone(),
        });
        match self.store.confirm_dispensed(&transaction.id).await {
            Ok(updated) => {
                info!(
                    reference = %updated.reference_number,
                    liters = %updated.liters_to_pump,
                    "dispense confirmed"
                );
                self.transition(DispenseState::Success {
                    transaction: updated,
                });
            }
            Err(error) => self.fail(error),
        }
    }

    fn on_dismiss(&mut self) {
        if matches!(
            *self.state.borrow(),
            DispenseState::AwaitingConfirmation { .. }
        ) {
            self.transition(DispenseState::Idle);
        } else {
            self.ignore("dismiss");
        }
    }

    fn on_acknowledge(&mut self) {
        if self.state.borrow().needs_acknowledgement() {
            self.transition(DispenseState::Idle);
        } else {
            self.ignore("acknowledge");
        }
    }
}
