pub mod exchange;
pub mod message;

pub use exchange::{split_into_exchanges, Exchange};
pub use message::{Message, Role};
