pub mod injector;
pub mod result;
