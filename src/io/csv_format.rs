//! CSV format handling for journal records and balance output
//!
//! This module centralizes all CSV format concerns, providing:
//! - JournalCsvRecord structure for deserialization
//! - Conversion from CSV records to journal events
//! - Allocation column parsing
//! - Balance output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Allocation, Balance, JournalRecord, SplitMode, UserId};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the journal columns:
/// `type, group, user, counterparty, amount, split, allocation, description`.
/// Which optional columns are required depends on the record type.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct JournalCsvRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub group: String,
    pub user: String,
    #[serde(default)]
    pub counterparty: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub split: Option<String>,
    #[serde(default)]
    pub allocation: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Treat missing and blank optional columns the same
fn non_blank(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_amount(field: &Option<String>, record_type: &str) -> Result<Decimal, String> {
    let raw = non_blank(field)
        .ok_or_else(|| format!("{} record requires an amount", record_type))?;
    Decimal::from_str(raw).map_err(|_| format!("Invalid amount '{}'", raw))
}

/// Parse an allocation column such as `alice=30;bob=70`
///
/// Blank input yields an empty allocation.
///
/// # Errors
///
/// Returns a message if an entry is not `user=value`, a value is not a
/// decimal, or a user appears twice.
pub fn parse_allocation(raw: &str) -> Result<Allocation, String> {
    let mut allocation = Allocation::new();

    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (user, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("Invalid allocation entry '{}'", entry))?;

        let user = user.trim();
        if user.is_empty() {
            return Err(format!("Invalid allocation entry '{}'", entry));
        }
        let value = Decimal::from_str(value.trim())
            .map_err(|_| format!("Invalid allocation value '{}' for {}", value.trim(), user))?;

        if allocation.insert(UserId::from(user), value).is_some() {
            return Err(format!("Duplicate allocation entry for {}", user));
        }
    }

    Ok(allocation)
}

/// Convert a JournalCsvRecord to a JournalRecord
///
/// This function:
/// - Parses the record type (case insensitive)
/// - Requires `group` and `user` for every record
/// - Requires `amount` for expenses and settlements, `counterparty` for settlements
/// - Parses the split mode (default `equal`) and allocation of expenses
///
/// # Returns
///
/// Result containing either:
/// - Ok(JournalRecord) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: JournalCsvRecord) -> Result<JournalRecord, String> {
    let record_type = csv_record.record_type.trim().to_lowercase();
    let group = csv_record.group.trim();
    let user = csv_record.user.trim();

    if group.is_empty() {
        return Err(format!("{} record requires a group", record_type));
    }
    if user.is_empty() {
        return Err(format!("{} record requires a user", record_type));
    }

    match record_type.as_str() {
        "join" => Ok(JournalRecord::Join {
            group: group.into(),
            user: user.into(),
        }),
        "expense" => {
            let amount = parse_amount(&csv_record.amount, "expense")?;
            let mode = match non_blank(&csv_record.split) {
                Some(raw) => raw.parse::<SplitMode>()?,
                None => SplitMode::default(),
            };
            let allocation = match non_blank(&csv_record.allocation) {
                Some(raw) => parse_allocation(raw)?,
                None => Allocation::new(),
            };

            Ok(JournalRecord::Expense {
                group: group.into(),
                payer: user.into(),
                amount,
                mode,
                allocation,
                description: non_blank(&csv_record.description)
                    .unwrap_or_default()
                    .to_string(),
            })
        }
        "settle" => {
            let amount = parse_amount(&csv_record.amount, "settle")?;
            let counterparty = non_blank(&csv_record.counterparty)
                .ok_or_else(|| "settle record requires a counterparty".to_string())?;

            Ok(JournalRecord::Settle {
                group: group.into(),
                from: user.into(),
                to: counterparty.into(),
                amount,
            })
        }
        _ => Err(format!(
            "Invalid record type: '{}' for group {}",
            csv_record.record_type, group
        )),
    }
}

/// Write outstanding balances to CSV format
///
/// Writes balances with columns: group, debtor, creditor, amount.
/// Rows are sorted by group, debtor, then creditor for deterministic output;
/// amounts are written with two decimal places.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_balances_csv(balances: &[Balance], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["group", "debtor", "creditor", "amount"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = balances.to_vec();
    sorted.sort_by(|a, b| {
        a.group
            .cmp(&b.group)
            .then_with(|| a.debtor.cmp(&b.debtor))
            .then_with(|| a.creditor.cmp(&b.creditor))
    });

    for balance in sorted {
        writer
            .write_record(&[
                balance.group.to_string(),
                balance.debtor.to_string(),
                balance.creditor.to_string(),
                format!("{:.2}", balance.amount),
            ])
            .map_err(|e| format!("Failed to write balance record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
