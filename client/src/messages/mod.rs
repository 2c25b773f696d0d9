mod handlers;
mod reliable;

pub use handlers::{HandlerToken, ReliableHandlers};
pub use reliable::{OutReliableCommand, ReliableError, ReliableSender};

pub(crate) use reliable::LARGE_ID_BIT;
