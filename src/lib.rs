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

//! # Fuel Dispense
//!
//! This library implements the dispense confirmation workflow of a fuel
//! management system: a gas slip's QR code is scanned at the pump, matched
//! against the known fuel transactions, checked for cancellation and, once the
//! attendant confirms, recorded as dispensed.
//!
//! ## Core Components
//!
//! - [`DispenseController`]: State machine driving a scan to a confirmed dispense
//! - [`qr`]: QR payload parsing and validation
//! - [`TransactionStore`] / [`SlipStatusQuery`]: Ports to the external data layer
//! - [`Screen`] / [`ConfirmationView`]: Pure rendering of the workflow state
//! - [`DispenseError`]: Error types surfaced to the attendant
//!
//! ## Example
//!
//! ```
//! use fuel_dispense_rs::{
//!     DispenseController, DispenseEvent, DispenseState, FuelTransaction, FuelType,
//!     InMemorySlipStatus, InMemoryTransactionStore, ReferenceNumber, TransactionId,
//!     TransactionStatus, VehicleId, WorkflowConfig,
//! };
//! use rust_decimal_macros::dec;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = InMemoryTransactionStore::new();
//! store.insert(FuelTransaction {
//!     id: TransactionId("tx-1".into()),
//!     reference_number: ReferenceNumber("MDRRMO-2024-0001".into()),
//!     vehicle_id: VehicleId("AMB-01".into()),
//!     driver_name: "J. Santos".into(),
//!     fuel_type: FuelType::Diesel,
//!     liters_to_pump: dec!(40),
//!     status: TransactionStatus::Pending,
//!     created_at: chrono::Utc::now(),
//! });
//!
//! let mut controller =
//!     DispenseController::new(store.clone(), InMemorySlipStatus::new(), WorkflowConfig::default());
//!
//! let state = controller
//!     .handle(DispenseEvent::Scanned(r#"{"referenceNumber":"MDRRMO-2024-0001"}"#.into()))
//!     .await;
//! assert!(matches!(state, DispenseState::AwaitingConfirmation { .. }));
//!
//! let state = controller.handle(DispenseEvent::Confirm).await;
//! assert!(matches!(state, DispenseState::Success { .. }));
//! # });
//! ```
//!
//! ## Concurrency
//!
//! The controller processes one event at a time. Store refreshes and slip
//! status queries are awaited in place, so a second scan cannot interleave
//! with one that is still being resolved.

mod base;
pub mod confirmation;
pub mod debounce;
pub mod error;
pub mod qr;
pub mod store;
mod transaction;
pub mod workflow;

pub use base::{ReferenceNumber, TransactionId, VehicleId};
pub use confirmation::{ConfirmationAction, ConfirmationView, Screen};
pub use debounce::ScanDebouncer;
pub use error::DispenseError;
pub use store::{InMemorySlipStatus, InMemoryTransactionStore, SlipStatusQuery, TransactionStore};
pub use transaction::{FuelTransaction, FuelType, ScannedTransaction, SlipStatus, TransactionStatus};
pub use workflow::{DispenseController, DispenseEvent, DispenseState, WorkflowConfig};
