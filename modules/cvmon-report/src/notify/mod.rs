pub mod backend;
pub mod noop;
pub mod outbox;
pub mod smtp;
