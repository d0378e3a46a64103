//! # Web API Request Handlers

pub mod health;
pub mod runs;
pub mod steps;
