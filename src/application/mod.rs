//! Application services: read queries through the cached pipeline, write
//! commands that refresh the affected cache scopes.

pub mod error;
pub mod facilities;
pub mod favorites;
pub mod lookups;
pub mod pagination;
pub mod patients;
pub mod query;
pub mod repos;
pub mod staff;
pub mod visits;
