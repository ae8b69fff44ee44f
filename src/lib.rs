// src/lib.rs

//! School menu to calendar sync library

pub mod calendar;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
