pub mod capabilities;
pub mod connect;
pub mod error;
pub mod message;
pub mod queue;
