#![allow(dead_code)]

pub mod pages;
pub mod services;
pub mod utils;
