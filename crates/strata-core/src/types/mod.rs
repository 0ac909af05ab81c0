mod event;
mod status;
mod stream;

pub use event::RecordedEvent;
pub use status::ProjectionStatus;
pub use stream::{Stream, StreamName};
