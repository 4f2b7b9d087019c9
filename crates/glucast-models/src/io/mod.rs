pub mod submission;
pub mod tabular;

pub use submission::write_submission;
pub use tabular::{read_table, Table, TableSchema};
