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

//! Presentation of the workflow state.
//!
//! Everything here is a pure function of a [`DispenseState`] or a
//! [`FuelTransaction`]; the only way out is the [`DispenseEvent`] an action
//! maps to.
//!
//! # Example
//!
//! ```
//! use fuel_dispense_rs::{DispenseState, Screen};
//!
//! assert_eq!(Screen::from(&DispenseState::Idle), Screen::Scanner);
//! ```

use crate::transaction::FuelTransaction;
use crate::workflow::{DispenseEvent, DispenseState};
use std::fmt;

/// Buttons offered by the confirmation card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationAction {
    Confirm,
    Cancel,
}

impl ConfirmationAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirm => "Confirm Dispense",
            Self::Cancel => "Cancel",
        }
    }
}

impl From<ConfirmationAction> for DispenseEvent {
    fn from(action: ConfirmationAction) -> Self {
        match action {
            ConfirmationAction::Confirm => DispenseEvent::Confirm,
            ConfirmationAction::Cancel => DispenseEvent::Dismiss,
        }
    }
}

/// Card showing a matched transaction and the confirm/cancel pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationView {
    pub title: String,
    pub rows: Vec<(&'static str, String)>,
    pub actions: [ConfirmationAction; 2],
}

impl ConfirmationView {
    const LITERS_PRECISION: u32 = 2;

    /// Renders the card as plain text.
    pub fn render(&self) -> String {
        let width = self.rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        let mut out = format!("== {} ==\n", self.title);
        for (label, value) in &self.rows {
            out.push_str(&format!("{label:<width$} : {value}\n"));
        }
        let buttons: Vec<String> = self
            .actions
            .iter()
            .map(|action| format!("[{}]", action.label()))
            .collect();
        out.push_str(&buttons.join(" "));
        out
    }
}

impl From<&FuelTransaction> for ConfirmationView {
    fn from(transaction: &FuelTransaction) -> Self {
        let liters = transaction
            .liters_to_pump
            .round_dp(Self::LITERS_PRECISION);
        Self {
            title: "Confirm Fuel Dispense".to_string(),
            rows: vec![
                ("Reference", transaction.reference_number.to_string()),
                ("Vehicle", transaction.vehicle_id.to_string()),
                ("Driver", transaction.driver_name.clone()),
                ("Fuel", transaction.fuel_type.to_string()),
                ("Liters", format!("{liters:.2} L")),
                ("Status", transaction.status.to_string()),
                (
                    "Created",
                    transaction.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                ),
            ],
            actions: [ConfirmationAction::Confirm, ConfirmationAction::Cancel],
        }
    }
}

impl fmt::Display for ConfirmationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// What the dispense screen shows for a given workflow state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Camera preview, waiting for a code.
    Scanner,
    /// Progress indicator with a short caption.
    Busy(String),
    Confirmation(ConfirmationView),
    SuccessBanner(String),
    ErrorBanner(String),
    CancelledDialog(String),
}

impl From<&DispenseState> for Screen {
    fn from(state: &DispenseState) -> Self {
        match state {
            DispenseState::Idle => Screen::Scanner,
            DispenseState::Parsing => Screen::Busy("Reading QR code...".to_string()),
            DispenseState::LookingUp { reference } => {
                Screen::Busy(format!("Looking up {reference}..."))
            }
            DispenseState::CheckingSlipStatus { transaction } => Screen::Busy(format!(
                "Checking gas slip {}...",
                transaction.reference_number
            )),
            DispenseState::AwaitingConfirmation { transaction } => {
                Screen::Confirmation(ConfirmationView::from(transaction))
            }
            DispenseState::Confirming { transaction } => Screen::Busy(format!(
                "Recording dispense for {}...",
                transaction.reference_number
            )),
            DispenseState::Success { transaction } => Screen::SuccessBanner(format!(
                "Fuel dispensed for {} ({:.2} L {})",
                transaction.reference_number,
                transaction
                    .liters_to_pump
                    .round_dp(ConfirmationView::LITERS_PRECISION),
                transaction.fuel_type
            )),
            DispenseState::Error { error } => Screen::ErrorBanner(error.to_string()),
            DispenseState::CancelledDialog { transaction } => Screen::CancelledDialog(format!(
                "The gas slip for {} has been cancelled and cannot be dispensed.",
                transaction.reference_number
            )),
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Scanner => write!(f, "Point the camera at a gas slip QR code"),
            Screen::Busy(caption) => write!(f, "... {caption}"),
            Screen::Confirmation(view) => write!(f, "{view}"),
            Screen::SuccessBanner(message) => write!(f, "[OK] {message}"),
            Screen::ErrorBanner(message) => write!(f, "[ERROR] {message}"),
            Screen::CancelledDialog(message) => write!(f, "[CANCELLED] {message}"),
        }
    }
}
