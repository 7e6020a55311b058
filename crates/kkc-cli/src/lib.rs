//! Command implementations behind `kkctool`.

pub mod commands;
pub mod trace_init;
