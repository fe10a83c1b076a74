//! Earthly secret provider for HashiCorp Vault
//!
//! Library side of the `earthly-secret-provider-vault` binary: argument
//! parsing, error rendering with exit codes, tracing setup, cancellation and
//! the command implementations. The resolution logic lives in `esp-secrets`
//! and `esp-vault`.

pub mod cli;
pub mod commands;
pub mod shutdown;
pub mod tracing;
