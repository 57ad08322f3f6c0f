#![forbid(unsafe_code)]

pub mod memory;
pub mod remote;
pub mod repository;
pub mod sqlite;
