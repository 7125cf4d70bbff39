pub mod field_updates;
