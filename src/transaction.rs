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

//! Fuel transactions and gas slip status.
//!
//! Transactions follow a state machine owned by the store:
//! - [`Pending`] → [`Approved`] → [`Dispensed`]
//! - [`Pending`] → [`Dispensed`] (direct dispense of an unapproved request)
//! - [`Pending`]/[`Approved`] → [`Rejected`] or [`Cancelled`]
//!
//! The dispense workflow only ever performs the `→ Dispensed` step.
//!
//! [`Pending`]: TransactionStatus::Pending
//! [`Approved`]: TransactionStatus::Approved
//! [`Dispensed`]: TransactionStatus::Dispensed
//! [`Rejected`]: TransactionStatus::Rejected
//! [`Cancelled`]: TransactionStatus::Cancelled

use crate::base::{ReferenceNumber, TransactionId, VehicleId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum FuelType {
    Gasoline,
    Diesel,
    Premium,
    Kerosene,
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gasoline => "Gasoline",
            Self::Diesel => "Diesel",
            Self::Premium => "Premium",
            Self::Kerosene => "Kerosene",
        };
        f.write_str(name)
    }
}

impl FromStr for FuelType {
    type Err = String;

    /// Accepts the upper-case wire names in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GASOLINE" => Ok(Self::Gasoline),
            "DIESEL" => Ok(Self::Diesel),
            "PREMIUM" => Ok(Self::Premium),
            "KEROSENE" => Ok(Self::Kerosene),
            other => Err(format!("unknown fuel type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Dispensed,
    Rejected,
    Cancelled,
}

impl TransactionStatus {
    /// Only pending and approved transactions may be marked as dispensed.
    pub fn is_dispensable(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Dispensed => "DISPENSED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// A fuel transaction as held by the external transaction store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FuelTransaction {
    pub id: TransactionId,
    pub reference_number: ReferenceNumber,
    pub vehicle_id: VehicleId,
    pub driver_name: String,
    pub fuel_type: FuelType,
    pub liters_to_pump: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl FuelTransaction {
    /// Exact, case-sensitive comparison against an already trimmed reference.
    ///
    /// The stored reference is trimmed as well so that stray whitespace on
    /// either side never prevents a match.
    pub fn matches(&self, reference: &ReferenceNumber) -> bool {
        self.reference_number.as_str().trim() == reference.as_str()
    }
}

/// Result of parsing a QR payload. Lives only until the lookup completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedTransaction {
    pub reference_number: ReferenceNumber,
}

/// Cancellation state of the gas slip attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlipStatus {
    Cancelled,
    /// Any status other than `CANCELLED`, kept verbatim.
    Other(String),
}

impl SlipStatus {
    const CANCELLED: &'static str = "CANCELLED";

    /// Interprets the raw status string returned by the slip status query.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == Self::CANCELLED {
            Self::Cancelled
        } else {
            Self::Other(trimmed.to_string())
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
