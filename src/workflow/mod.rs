pub mod poller;
pub mod runner;

pub use poller::{poll_until_finished, wait_for_order, PollPolicy};
pub use runner::{BasketRunner, RunReport};
