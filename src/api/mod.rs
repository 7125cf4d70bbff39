pub mod absence;
pub mod person;
pub mod salary;
