mod read_model;
mod store;

pub use read_model::ReadModel;
pub use store::{EventIter, EventStore};
