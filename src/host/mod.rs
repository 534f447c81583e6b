pub mod channel;
pub mod controller;
pub mod protocol;
