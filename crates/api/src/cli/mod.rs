//! Command-line interface: argument definitions and the resolved [`config::Config`].

pub mod commands;
pub mod config;
