pub mod academic;
pub mod person;
pub mod role;
pub mod salary;

pub use academic::{AcademicYear, DateKey, KeyError, MonthKey};
pub use person::{DayBook, DayNote, Person, PersonKind};
pub use role::Role;
pub use salary::{Ledger, SalaryEntry, YearLedger};
