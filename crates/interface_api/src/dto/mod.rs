//! Request and response bodies

pub mod expenses;
pub mod rules;
