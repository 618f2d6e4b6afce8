mod common;
pub use self::common::{Query, SortDirection};

mod rows;
pub use self::rows::RowQuery;
