pub mod capability;
pub mod dom_model;
pub mod page;
pub mod parse;
pub mod serialize;
