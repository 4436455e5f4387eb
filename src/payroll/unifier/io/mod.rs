pub mod csv_store;
pub mod excel_read;
