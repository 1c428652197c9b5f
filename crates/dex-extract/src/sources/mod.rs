//! Row source implementations.

mod csv;
mod executor;
mod frame;
mod memory;

pub use self::csv::CsvFileSource;
pub use executor::QueryRowSource;
pub use frame::DataFrameSource;
pub use memory::InMemorySource;
