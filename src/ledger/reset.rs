use tracing::{instrument, warn};

use crate::ledger::LedgerError;
use crate::model::person::salaries_path;
use crate::model::{AcademicYear, Person};
use crate::store::{DocumentStore, WriteBatch};

/// One `salaries.<year>` field delete per person, all in a single batch.
pub fn reset_batch<'a>(year: AcademicYear, people: impl IntoIterator<Item = &'a Person>) -> WriteBatch {
    let path = salaries_path(year);
    let mut batch = WriteBatch::new();
    for person in people {
        batch.delete_field(person.kind.collection(), &person.id, path.clone());
    }
    batch
}

/// Irreversibly removes one academic year of salary data from every given
/// record. Either every record loses the year or none does. Returns the number
/// of records in the batch.
#[instrument(name = "salary_ledger_reset", skip(store, people), fields(year = %year))]
pub async fn reset_year(store: &dyn DocumentStore, year: AcademicYear, people: &[Person]) -> Result<usize, LedgerError> {
    let batch = reset_batch(year, people);
    if batch.is_empty() {
        return Ok(0);
    }

    let records = batch.len();
    store.commit(batch).await?;

    warn!(records, "salary ledger reset");
    Ok(records)
}
