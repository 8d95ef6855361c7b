//! Application services: episode listing, search inclusion and startup glue.

pub mod episodes;
pub mod error;
pub mod hooks;
pub mod listeners;
pub mod repos;
pub mod roles;
pub mod search;
pub mod titles;
