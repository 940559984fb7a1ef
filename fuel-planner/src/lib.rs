//! Fuel route planner server.
//!
//! A web application that answers: "I'm driving from here to there,
//! where should I stop for fuel to spend the least?"

pub mod cache;
pub mod config;
pub mod domain;
pub mod geo;
pub mod optimizer;
pub mod planner;
pub mod routing;
pub mod stations;
pub mod web;
