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

//! QR payload parsing.
//!
//! Gas slips carry a JSON object in their QR code. Only `referenceNumber` is
//! required; the descriptive fields printed alongside it are optional and are
//! validated only when present.
//!
//! ```json
//! {"referenceNumber": "MDRRMO-2024-0001", "vehicleId": "AMB-01", "litersToPump": 40}
//! ```
//!
//! # Example
//!
//! ```
//! use fuel_dispense_rs::qr;
//!
//! let scanned = qr::parse(r#"{"referenceNumber": " MDRRMO-2024-0001 "}"#).unwrap();
//! assert_eq!(scanned.reference_number.as_str(), "MDRRMO-2024-0001");
//!
//! assert!(qr::parse_scanned("not json").is_none());
//! ```

use crate::DispenseError;
use crate::base::ReferenceNumber;
use crate::transaction::{FuelType, ScannedTransaction};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

/// Raw QR payload as encoded on the gas slip.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub reference_number: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub fuel_type: Option<String>,
    /// Number or decimal string; checked by [`QrPayload::validate`].
    #[serde(default)]
    pub liters_to_pump: Option<Value>,
}

impl QrPayload {
    /// Secondary validation of a structurally well-formed payload.
    ///
    /// # Errors
    ///
    /// Returns [`DispenseError::ValidationFailure`] naming the first offending field.
    pub fn validate(&self) -> Result<(), DispenseError> {
        if self.reference_number.trim().is_empty() {
            return Err(invalid("reference number is empty"));
        }
        if let Some(fuel_type) = &self.fuel_type {
            FuelType::from_str(fuel_type).map_err(DispenseError::ValidationFailure)?;
        }
        if let Some(liters) = &self.liters_to_pump {
            let liters = decimal_from_json(liters)
                .ok_or_else(|| invalid("liters to pump is not a number"))?;
            if liters <= Decimal::ZERO {
                return Err(invalid("liters to pump must be positive"));
            }
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> DispenseError {
    DispenseError::ValidationFailure(reason.to_string())
}

fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Parses and validates a raw decoder payload.
///
/// # Errors
///
/// - [`DispenseError::ParseFailure`] - empty input, not a JSON object, or no string `referenceNumber`.
/// - [`DispenseError::ValidationFailure`] - well-formed payload rejected by [`QrPayload::validate`].
pub fn parse(raw: &str) -> Result<ScannedTransaction, DispenseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DispenseError::ParseFailure);
    }

    // The derived impl also accepts positional arrays; only objects are payloads.
    let value: Value = serde_json::from_str(raw).map_err(|_| DispenseError::ParseFailure)?;
    if !value.is_object() {
        return Err(DispenseError::ParseFailure);
    }
    let payload: QrPayload =
        serde_json::from_value(value).map_err(|_| DispenseError::ParseFailure)?;
    payload.validate()?;

    Ok(ScannedTransaction {
        reference_number: ReferenceNumber::normalized(&payload.reference_number),
    })
}

/// Nullable form of [`parse`]: `None` for any malformed or invalid payload.
pub fn parse_scanned(raw: &str) -> Option<ScannedTransaction> {
    parse(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_payload() {
        let scanned = parse(r#"{"referenceNumber":"MDRRMO-2024-0001"}"#).unwrap();
        assert_eq!(scanned.reference_number.as_str(), "MDRRMO-2024-0001");
    }

    #[test]
    fn parse_full_payload() {
        let raw = r#"{
            "referenceNumber": "MDRRMO-2024-0001",
            "transactionId": "abc123",
            "vehicleId": "AMB-01",
            "driverName": "J. Santos",
            "fuelType": "DIESEL",
            "litersToPump": "40.5",
            "issuedBy": "admin"
        }"#;
        let scanned = parse(raw).unwrap();
        assert_eq!(scanned.reference_number.as_str(), "MDRRMO-2024-0001");
    }

    #[test]
    fn parse_trims_reference() {
        let scanned = parse(r#"{"referenceNumber":"  MDRRMO-2024-0001\n"}"#).unwrap();
        assert_eq!(scanned.reference_number.as_str(), "MDRRMO-2024-0001");
    }

    #[test]
    fn empty_and_garbage_are_parse_failures() {
        for raw in [
            "",
            "   ",
            "not json",
            "{",
            "[]",
            "42",
            "\"MDRRMO-2024-0001\"",
            r#"["MDRRMO-2024-0001"]"#,
        ] {
            assert_eq!(parse(raw), Err(DispenseError::ParseFailure), "payload {raw:?}");
        }
    }

    #[test]
    fn positional_arrays_are_parse_failures() {
        for raw in [
            r#"["MDRRMO-2024-0001"]"#,
            r#"["R-1", null, null, null, "DIESEL", "40"]"#,
        ] {
            assert_eq!(parse(raw), Err(DispenseError::ParseFailure), "payload {raw:?}");
        }
    }

    #[test]
    fn missing_or_mistyped_reference_is_parse_failure() {
        assert_eq!(parse(r#"{"vehicleId":"AMB-01"}"#), Err(DispenseError::ParseFailure));
        assert_eq!(parse(r#"{"referenceNumber":17}"#), Err(DispenseError::ParseFailure));
        assert_eq!(parse(r#"{"referenceNumber":null}"#), Err(DispenseError::ParseFailure));
    }

    #[test]
    fn blank_reference_is_validation_failure() {
        assert_eq!(
            parse(r#"{"referenceNumber":"   "}"#),
            Err(DispenseError::ValidationFailure("reference number is empty".into()))
        );
    }

    #[test]
    fn non_positive_liters_is_validation_failure() {
        for liters in ["0", "-5", "\"0.00\""] {
            let raw = format!(r#"{{"referenceNumber":"R-1","litersToPump":{liters}}}"#);
            assert_eq!(
                parse(&raw),
                Err(DispenseError::ValidationFailure(
                    "liters to pump must be positive".into()
                ))
            );
        }
    }

    #[test]
    fn non_numeric_liters_is_validation_failure() {
        let raw = r#"{"referenceNumber":"R-1","litersToPump":"lots"}"#;
        assert!(matches!(parse(raw), Err(DispenseError::ValidationFailure(_))));
    }

    #[test]
    fn unknown_fuel_type_is_validation_failure() {
        let raw = r#"{"referenceNumber":"R-1","fuelType":"plasma"}"#;
        assert!(matches!(parse(raw), Err(DispenseError::ValidationFailure(_))));
    }

    #[test]
    fn parse_scanned_is_nullable() {
        assert!(parse_scanned("garbage").is_none());
        assert!(parse_scanned(r#"{"referenceNumber":""}"#).is_none());
        assert!(parse_scanned(r#"{"referenceNumber":"R-1"}"#).is_some());
    }
}
