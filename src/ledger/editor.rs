use tracing::{info, instrument};

use crate::ledger::LedgerError;
use crate::ledger::money::{self, MAX_SALARY_AMOUNT};
use crate::model::person::salaries_path;
use crate::model::{AcademicYear, MonthKey, PersonKind, SalaryEntry};
use crate::store::{DocumentStore, FieldPath, FieldUpdate};

/// One cell edit in the salary table.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryEdit {
    pub person_kind: PersonKind,
    pub person_id: String,
    pub year: AcademicYear,
    pub month: MonthKey,
    pub amount: f64,
    pub notes: String,
}

impl SalaryEdit {
    /// `salaries.<year>.<month>`
    pub fn path(&self) -> FieldPath {
        salaries_path(self.year).child(self.month.to_string())
    }

    /// Entry as written, amount rounded to the cent.
    pub fn entry(&self) -> SalaryEntry {
        SalaryEntry::new(money::normalize(self.amount), self.notes.clone())
    }
}

/// Replaces one (person, year, month) entry with a single path-scoped update.
/// The previous value is never read, so edits of different months commute
/// and same-cell edits are last-write-wins.
#[instrument(
    name = "salary_entry_write",
    skip(store, edit),
    fields(kind = %edit.person_kind, person_id = %edit.person_id, year = %edit.year, month = %edit.month)
)]
pub async fn set_salary_entry(store: &dyn DocumentStore, edit: &SalaryEdit) -> Result<(), LedgerError> {
    if !edit.amount.is_finite() || !(0.0..=MAX_SALARY_AMOUNT).contains(&edit.amount) {
        return Err(LedgerError::InvalidAmount(edit.amount));
    }

    let update = FieldUpdate::new(edit.path(), edit.entry().to_value());
    store
        .update_fields(edit.person_kind.collection(), &edit.person_id, vec![update])
        .await?;

    info!(amount = edit.amount, "salary entry written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use serde_json::json;

    fn edit(month: u8, amount: f64, notes: &str) -> SalaryEdit {
        SalaryEdit {
            person_kind: PersonKind::Teacher,
            person_id: "t1".into(),
            year: "academic_2024-2025".parse().unwrap(),
            month: MonthKey::new(month).unwrap(),
            amount,
            notes: notes.into(),
        }
    }

    #[test]
    fn path_targets_year_and_month() {
        assert_eq!(edit(11, 1.0, "").path().to_string(), "salaries.academic_2024-2025.11");
    }

    #[tokio::test]
    async fn rejects_negative_and_non_finite_amounts() {
        let store = MemoryStore::new();
        store.put("teachers", "t1", json!({"fullName": "T"})).await;

        for amount in [-1.0, f64::NAN, f64::INFINITY, f64::MAX, MAX_SALARY_AMOUNT + 0.01] {
            let err = set_salary_entry(&store, &edit(9, amount, "")).await.unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount(_)));
        }

        let doc = store.get("teachers", "t1").await.unwrap().unwrap();
        assert_eq!(doc.body, json!({"fullName": "T"}));
    }

    #[tokio::test]
    async fn unknown_person_is_not_found() {
        let store = MemoryStore::new();
        let err = set_salary_entry(&store, &edit(9, 10.0, "")).await.unwrap_err();
        assert_eq!(err, LedgerError::Store(StoreError::not_found("teachers", "t1")));
    }

    #[tokio::test]
    async fn first_write_creates_the_ledger() {
        let store = MemoryStore::new();
        store.put("teachers", "t1", json!({"fullName": "T"})).await;

        set_salary_entry(&store, &edit(9, 0.0, "x")).await.unwrap();

        let doc = store.get("teachers", "t1").await.unwrap().unwrap();
        assert_eq!(
            doc.body["salaries"],
            json!({"academic_2024-2025": {"9": {"amount": 0.0, "notes": "x"}}})
        );
    }

    #[tokio::test]
    async fn amount_is_stored_to_the_cent() {
        let store = MemoryStore::new();
        store.put("teachers", "t1", json!({"fullName": "T"})).await;

        set_salary_entry(&store, &edit(9, 250.557, "")).await.unwrap();
        set_salary_entry(&store, &edit(10, MAX_SALARY_AMOUNT, "")).await.unwrap();

        let doc = store.get("teachers", "t1").await.unwrap().unwrap();
        assert_eq!(doc.body["salaries"]["academic_2024-2025"]["9"]["amount"], json!(250.56));
        assert_eq!(doc.body["salaries"]["academic_2024-2025"]["10"]["amount"], json!(1_000_000.0));
    }
}
