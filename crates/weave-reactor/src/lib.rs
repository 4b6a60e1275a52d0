mod poll;
mod registry;

pub use poll::{PollOptions, PollReactor};
