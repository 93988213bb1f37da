//! Request handlers

pub mod expenses;
pub mod health;
pub mod reference;
pub mod rules;
