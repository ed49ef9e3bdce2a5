//! Core business logic for Cozum Var.
//!
//! [`policy`] decides who may see and change what; [`services`] apply those
//! decisions on top of the repositories.

pub mod policy;
pub mod services;

pub use policy::{Action, Actor, Decision, ListScope, Resource};
pub use services::*;
