//! Command-line host for the OpenID Connect callback pipeline.

pub mod cli;
pub mod error;
