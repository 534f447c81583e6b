pub mod detector;
pub mod extractor;
pub mod field_model;
pub mod label;
pub mod scorer;
