use crate::api::person::{PersonListResponse, PersonQuery};
use crate::api::salary::{ResetQuery, SalaryEntryRequest, YearQuery};
use crate::ledger::aggregate::{LedgerCell, LedgerRollup, LedgerRow, MonthTotal, SectionRollup};
use crate::model::{DayNote, PersonKind, SalaryEntry};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Administration API",
        version = "1.0.0",
        description = r#"
## School Administration

Back end for the school office screens.

### Key Features
- **Teachers and Employees**
  - Create, update, list, view and delete staff records
- **Absences and Leaves**
  - Record or remove a day with notes on any staff record
- **Salaries**
  - Monthly salary table per academic year with per-person, per-month and grand totals
  - Edit one (person, month) cell at a time
  - Reset a whole academic year for everyone in one atomic step (admin only)

### Security
Every endpoint requires a **JWT Bearer** token. Only **admin** tokens may reset a salary year.

### Conventions
- Academic years are keyed `academic_<Y>-<Y+1>` and run from month `9` to month `8`.
- A month with no entry is `null`, which is not the same as an entry of `0`.
"#,
    ),
    paths(
        crate::api::person::create_person,
        crate::api::person::list_persons,
        crate::api::person::get_person,
        crate::api::person::update_person,
        crate::api::person::delete_person,

        crate::api::absence::put_day,
        crate::api::absence::delete_day,

        crate::api::salary::salary_table,
        crate::api::salary::put_salary_entry,
        crate::api::salary::reset_salaries
    ),
    components(
        schemas(
            PersonKind,
            PersonQuery,
            PersonListResponse,
            DayNote,
            SalaryEntry,
            SalaryEntryRequest,
            YearQuery,
            ResetQuery,
            LedgerCell,
            LedgerRow,
            MonthTotal,
            SectionRollup,
            LedgerRollup
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Persons", description = "Teacher and employee records"),
        (name = "Absences", description = "Absence and leave days"),
        (name = "Salaries", description = "Salary ledger"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
