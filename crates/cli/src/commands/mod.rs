//! CLI Commands

pub mod pool;
