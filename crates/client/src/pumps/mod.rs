//! WebSocket pump tasks, one pair per connection.

pub(crate) mod read;
pub(crate) mod write;
