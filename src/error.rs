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

//! Error types for the dispense confirmation workflow.

use crate::base::ReferenceNumber;
use crate::transaction::TransactionStatus;
use thiserror::Error;

/// Dispense workflow errors.
///
/// Every variant is surfaced to the operator as a banner or dialog; none is
/// retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispenseError {
    /// Payload is empty, not JSON, or lacks a reference number
    #[error("invalid QR code data - parsing failed")]
    ParseFailure,

    /// Payload is well-formed but semantically invalid
    #[error("invalid QR code data - {0}")]
    ValidationFailure(String),

    /// No transaction carries the scanned reference, even after a refresh
    #[error("transaction not found: {0}")]
    NotFound(ReferenceNumber),

    /// The gas slip for the transaction was administratively cancelled
    #[error("gas slip cancelled: {0}")]
    Cancelled(ReferenceNumber),

    /// Transaction is not in a state that can be dispensed
    #[error("transaction {reference} cannot be dispensed (status {status})")]
    NotDispensable {
        reference: ReferenceNumber,
        status: TransactionStatus,
    },

    /// Transaction store failed to refresh or to apply a mutation
    #[error("transaction store error: {0}")]
    Store(String),

    /// Slip status could not be fetched
    #[error("slip status query failed: {0}")]
    SlipQuery(String),
}

#[cfg(test)]
mod tests {
    use super::DispenseError;
    use crate::base::ReferenceNumber;
    use crate::transaction::TransactionStatus;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            DispenseError::ParseFailure.to_string(),
            "invalid QR code data - parsing failed"
        );
        assert_eq!(
            DispenseError::ValidationFailure("reference number is empty".into()).to_string(),
            "invalid QR code data - reference number is empty"
        );
        assert_eq!(
            DispenseError::NotFound(ReferenceNumber("MDRRMO-2024-9999".into())).to_string(),
            "transaction not found: MDRRMO-2024-9999"
        );
        assert_eq!(
            DispenseError::Cancelled(ReferenceNumber("MDRRMO-2024-0002".into())).to_string(),
            "gas slip cancelled: MDRRMO-2024-0002"
        );
        assert_eq!(
            DispenseError::NotDispensable {
                reference: ReferenceNumber("R-1".into()),
                status: TransactionStatus::Dispensed,
            }
            .to_string(),
            "transaction R-1 cannot be dispensed (status DISPENSED)"
        );
        assert_eq!(
            DispenseError::Store("offline".into()).to_string(),
            "transaction store error: offline"
        );
        assert_eq!(
            DispenseError::SlipQuery("timeout".into()).to_string(),
            "slip status query failed: timeout"
        );
    }

    #[test]
    fn errors_are_cloneable() {
        let error = DispenseError::NotFound(ReferenceNumber("R-1".into()));
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
