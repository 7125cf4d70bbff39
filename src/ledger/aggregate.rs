//! Salary totals over a snapshot of person records.
//!
//! Everything here is pure and infallible. Absent years, months and amounts
//! count as zero. Sums run in `Decimal` and are converted at the edge, so
//! per-person and per-month totals always add up to the same grand total.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::ledger::money;
use crate::model::{AcademicYear, MonthKey, Person, PersonKind, SalaryEntry};

fn person_sum(person: &Person, year: AcademicYear) -> Decimal {
    person
        .salaries
        .get(&year)
        .map(|months| months.values().map(|entry| money::to_decimal(entry.amount)).sum())
        .unwrap_or_default()
}

fn month_sum<'a>(people: impl IntoIterator<Item = &'a Person>, year: AcademicYear, month: MonthKey) -> Decimal {
    people
        .into_iter()
        .filter_map(|person| entry_for(person, year, month))
        .map(|entry| money::to_decimal(entry.amount))
        .sum()
}

fn people_sum<'a>(people: impl IntoIterator<Item = &'a Person>, year: AcademicYear) -> Decimal {
    people.into_iter().map(|person| person_sum(person, year)).sum()
}

pub fn total_for_person(person: &Person, year: AcademicYear) -> f64 {
    money::to_f64(person_sum(person, year))
}

pub fn month_amount(person: &Person, year: AcademicYear, month: MonthKey) -> f64 {
    entry_for(person, year, month)
        .map(|entry| money::normalize(entry.amount))
        .unwrap_or(0.0)
}

pub fn entry_for(person: &Person, year: AcademicYear, month: MonthKey) -> Option<&SalaryEntry> {
    person.salaries.get(&year)?.get(&month)
}

pub fn total_for_month<'a>(people: impl IntoIterator<Item = &'a Person>, year: AcademicYear, month: MonthKey) -> f64 {
    money::to_f64(month_sum(people, year, month))
}

/// Equal to [`money::sum_amounts`] of [`total_for_month`] over the twelve months.
pub fn grand_total<'a>(people: impl IntoIterator<Item = &'a Person>, year: AcademicYear) -> f64 {
    money::to_f64(people_sum(people, year))
}

/// Splits records by the kind tagged on them at fetch time: (teachers, employees).
pub fn partition<'a>(people: impl IntoIterator<Item = &'a Person>) -> (Vec<&'a Person>, Vec<&'a Person>) {
    people
        .into_iter()
        .partition(|person| person.kind == PersonKind::Teacher)
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LedgerCell {
    #[schema(example = "9")]
    pub month: String,
    /// `null` when nothing was recorded for the month.
    pub entry: Option<SalaryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LedgerRow {
    pub id: String,
    pub full_name: String,
    pub cells: Vec<LedgerCell>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthTotal {
    #[schema(example = "9")]
    pub month: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SectionRollup {
    pub kind: PersonKind,
    pub rows: Vec<LedgerRow>,
    pub month_totals: Vec<MonthTotal>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LedgerRollup {
    #[schema(example = "academic_2024-2025")]
    pub year: String,
    /// Month keys in academic order; cells and totals follow the same order.
    pub months: Vec<String>,
    pub teachers: SectionRollup,
    pub employees: SectionRollup,
    pub month_totals: Vec<MonthTotal>,
    pub grand_total: f64,
}

/// Section figures kept exact until the combined totals are built.
struct SectionSums {
    months: Vec<Decimal>,
    total: Decimal,
}

impl SectionRollup {
    fn build(kind: PersonKind, mut people: Vec<&Person>, year: AcademicYear) -> (Self, SectionSums) {
        people.sort_by(|a, b| a.full_name.cmp(&b.full_name).then_with(|| a.id.cmp(&b.id)));

        let rows = people
            .iter()
            .map(|person| LedgerRow {
                id: person.id.clone(),
                full_name: person.full_name.clone(),
                cells: MonthKey::academic_order()
                    .map(|month| LedgerCell {
                        month: month.to_string(),
                        entry: entry_for(person, year, month).cloned(),
                    })
                    .collect(),
                total: total_for_person(person, year),
            })
            .collect();

        let sums = SectionSums {
            months: MonthKey::academic_order()
                .map(|month| month_sum(people.iter().copied(), year, month))
                .collect(),
            total: people_sum(people.iter().copied(), year),
        };

        let section = Self {
            kind,
            rows,
            month_totals: month_totals(&sums.months),
            total: money::to_f64(sums.total),
        };
        (section, sums)
    }
}

fn month_totals(sums: &[Decimal]) -> Vec<MonthTotal> {
    MonthKey::academic_order()
        .zip(sums)
        .map(|(month, total)| MonthTotal {
            month: month.to_string(),
            total: money::to_f64(*total),
        })
        .collect()
}

/// Ledger table for one academic year: a section per kind plus combined totals.
pub fn rollup<'a>(people: impl IntoIterator<Item = &'a Person>, year: AcademicYear) -> LedgerRollup {
    let (teachers, employees) = partition(people);

    let (teachers, teacher_sums) = SectionRollup::build(PersonKind::Teacher, teachers, year);
    let (employees, employee_sums) = SectionRollup::build(PersonKind::Employee, employees, year);

    let combined: Vec<Decimal> = teacher_sums
        .months
        .iter()
        .zip(&employee_sums.months)
        .map(|(t, e)| t + e)
        .collect();

    LedgerRollup {
        year: year.key(),
        months: MonthKey::academic_order().map(|m| m.to_string()).collect(),
        month_totals: month_totals(&combined),
        grand_total: money::to_f64(teacher_sums.total + employee_sums.total),
        teachers,
        employees,
    }
}
