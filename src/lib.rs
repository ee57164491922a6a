//! Filter-and-aggregate engine behind the California housing dashboards.
//!
//! [`data::filter::apply`] turns a table of [`HousingRecord`]s and a set of
//! [`FilterCriteria`] into a [`FilteredResult`]: the matching rows in input
//! order plus [`SummaryStats`]. Everything else here feeds that function or
//! consumes its output.

pub mod data;
pub mod state;

pub use data::error::{MalformedReason, MalformedRecordError};
pub use data::filter::{apply, FilterCriteria, FilteredResult, IncomeBracket, PriceRange};
pub use data::model::{HousingDataset, HousingRecord};
pub use data::stats::{summarize, SummaryStats};
pub use state::ExplorerState;
