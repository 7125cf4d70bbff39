use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::model::academic::{AcademicYear, DateKey};
use crate::model::salary::{Ledger, ledger_from_value};
use crate::store::{Document, FieldPath};

pub const FULL_NAME_FIELD: &str = "fullName";
pub const SALARIES_FIELD: &str = "salaries";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PersonKind {
    Teacher,
    Employee,
}

impl PersonKind {
    /// Collection the records of this kind live in.
    pub fn collection(self) -> &'static str {
        match self {
            PersonKind::Teacher => "teachers",
            PersonKind::Employee => "employees",
        }
    }

    pub fn from_collection(collection: &str) -> Option<Self> {
        match collection {
            "teachers" => Some(PersonKind::Teacher),
            "employees" => Some(PersonKind::Employee),
            _ => None,
        }
    }
}

/// Per-day note books carried on person records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum DayBook {
    Absences,
    Leaves,
}

impl DayBook {
    pub fn field(self) -> &'static str {
        match self {
            DayBook::Absences => "absences",
            DayBook::Leaves => "leaves",
        }
    }

    pub fn entry_path(self, day: DateKey) -> FieldPath {
        FieldPath::new([self.field().to_string(), day.to_string()])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DayNote {
    #[schema(example = "medical certificate received")]
    #[serde(default)]
    pub notes: String,
}

impl DayNote {
    fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        Some(Self {
            notes: fields
                .get("notes")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

pub type DayBookEntries = BTreeMap<DateKey, DayNote>;

/// Typed view of a teacher or employee record. Fields the service does not
/// model are kept untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub kind: PersonKind,
    pub full_name: String,
    pub salaries: Ledger,
    pub absences: DayBookEntries,
    pub leaves: DayBookEntries,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Person {
    pub fn new(id: impl Into<String>, kind: PersonKind, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            full_name: full_name.into(),
            salaries: Ledger::new(),
            absences: DayBookEntries::new(),
            leaves: DayBookEntries::new(),
            extra: Map::new(),
        }
    }

    /// Builds a person from a stored document. Never fails: missing or
    /// malformed fields fall back to empty values.
    pub fn from_document(kind: PersonKind, document: &Document) -> Self {
        let empty = Map::new();
        let fields = document.body.as_object().unwrap_or(&empty);

        let extra = fields
            .iter()
            .filter(|(key, _)| !is_modelled_field(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            id: document.id.clone(),
            kind,
            full_name: fields
                .get(FULL_NAME_FIELD)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            salaries: ledger_from_value(fields.get(SALARIES_FIELD)),
            absences: day_book_from_value(fields.get(DayBook::Absences.field())),
            leaves: day_book_from_value(fields.get(DayBook::Leaves.field())),
            extra,
        }
    }

    pub fn day_book(&self, book: DayBook) -> &DayBookEntries {
        match book {
            DayBook::Absences => &self.absences,
            DayBook::Leaves => &self.leaves,
        }
    }
}

/// Fields owned by the ledger and day books, or by the store itself. `kind`
/// always comes from the collection, never from record content.
pub fn is_modelled_field(key: &str) -> bool {
    matches!(key, "id" | "kind" | FULL_NAME_FIELD | SALARIES_FIELD | "absences" | "leaves")
}

pub fn salaries_path(year: AcademicYear) -> FieldPath {
    FieldPath::new([SALARIES_FIELD.to_string(), year.key()])
}

fn day_book_from_value(value: Option<&Value>) -> DayBookEntries {
    let Some(days) = value.and_then(Value::as_object) else {
        return DayBookEntries::new();
    };

    days.iter()
        .filter_map(|(day, note)| Some((day.parse::<DateKey>().ok()?, DayNote::from_value(note)?)))
        .collect()
}
