use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::model::academic::{AcademicYear, MonthKey};

/// One (person, year, month) cell. Always written whole, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SalaryEntry {
    #[schema(example = 500.0)]
    pub amount: f64,
    #[schema(example = "")]
    #[serde(default)]
    pub notes: String,
}

pub type YearLedger = BTreeMap<MonthKey, SalaryEntry>;

/// Full `salaries` map of one person record.
pub type Ledger = BTreeMap<AcademicYear, YearLedger>;

impl SalaryEntry {
    pub fn new(amount: f64, notes: impl Into<String>) -> Self {
        Self {
            amount,
            notes: notes.into(),
        }
    }

    /// Reads a stored entry. Anything that is not an object is treated as absent;
    /// a bad amount reads as zero.
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;

        Some(Self {
            amount: fields.get("amount").map(lenient_amount).unwrap_or(0.0),
            notes: fields
                .get("notes")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "amount": self.amount,
            "notes": self.notes,
        })
    }
}

pub fn lenient_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    amount
        .filter(|a| a.is_finite() && *a >= 0.0)
        .unwrap_or(0.0)
}

/// Parses a stored `salaries` value, skipping keys that are not a valid
/// academic year or month.
pub fn ledger_from_value(value: Option<&Value>) -> Ledger {
    let Some(years) = value.and_then(Value::as_object) else {
        return Ledger::new();
    };

    years
        .iter()
        .filter_map(|(year, months)| {
            let year = year.parse::<AcademicYear>().ok()?;
            let months = months.as_object()?;

            let entries = months
                .iter()
                .filter_map(|(month, entry)| {
                    Some((month.parse::<MonthKey>().ok()?, SalaryEntry::from_value(entry)?))
                })
                .collect::<YearLedger>();

            Some((year, entries))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bad_amounts_read_as_zero() {
        assert_eq!(lenient_amount(&json!(250.5)), 250.5);
        assert_eq!(lenient_amount(&json!("300")), 300.0);
        assert_eq!(lenient_amount(&json!("abc")), 0.0);
        assert_eq!(lenient_amount(&json!(null)), 0.0);
        assert_eq!(lenient_amount(&json!(-5)), 0.0);
        assert_eq!(lenient_amount(&json!({"amount": 1})), 0.0);
    }

    #[test]
    fn entry_without_amount_is_present_with_zero() {
        let entry = SalaryEntry::from_value(&json!({"notes": "pending"})).unwrap();
        assert_eq!(entry, SalaryEntry::new(0.0, "pending"));

        assert!(SalaryEntry::from_value(&json!(42)).is_none());
    }

    #[test]
    fn ledger_skips_unreadable_keys() {
        let raw = json!({
            "academic_2024-2025": {
                "9": {"amount": 500, "notes": ""},
                "13": {"amount": 1},
                "10": "garbage"
            },
            "not_a_year": {"9": {"amount": 7}},
            "academic_2023-2024": 12
        });

        let ledger = ledger_from_value(Some(&raw));
        assert_eq!(ledger.len(), 1);

        let year: AcademicYear = "academic_2024-2025".parse().unwrap();
        let months = &ledger[&year];
        assert_eq!(months.len(), 1);
        assert_eq!(months[&MonthKey::new(9).unwrap()].amount, 500.0);
    }

    #[test]
    fn missing_salaries_is_an_empty_ledger() {
        assert!(ledger_from_value(None).is_empty());
        assert!(ledger_from_value(Some(&json!("oops"))).is_empty());
    }
}
