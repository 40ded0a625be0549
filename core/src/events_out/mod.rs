pub mod writer;

pub use crate::config::EventsOutConfig;
pub use writer::{spawn_events_writer, start_events_out, EventsOut, EventsOutTx};
