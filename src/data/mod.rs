pub mod csv;
pub mod fetch;
pub mod query;
pub mod record;
pub mod store;
