//! Back end of the school administration screens: teacher and employee
//! records, their absence and leave books, and the salary ledger with its
//! per-month and per-year totals.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod ledger;
pub mod model;
pub mod routes;
pub mod store;
pub mod utils;
