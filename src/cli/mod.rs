//! # CLI Module
//!
//! Command-line inspection of a dispatch configuration.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! Print the route table, interceptor registration order and CORS mappings:
//!
//! ```bash
//! brrtdispatch routes --config dispatch.yaml
//! ```
//!
//! ### `resolve`
//!
//! Run handler mapping, CORS processing and media type negotiation for a
//! synthetic request:
//!
//! ```bash
//! brrtdispatch resolve --config dispatch.yaml \
//!     --method OPTIONS --path /orders/42 \
//!     -H 'Origin: https://app.example.com' \
//!     -H 'Access-Control-Request-Method: DELETE'
//! ```
//!
//! Handlers and interceptors are placeholders named after the configured
//! names, so the output shows the pipeline's decisions without running any
//! application code.
//!
//! `--config` falls back to the `BRRTD_CONFIG` environment variable.
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use brrtdispatch::cli::{execute, Cli};
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! execute(&cli, &mut std::io::stdout())?;
//! ```

mod commands;


pub use commands::{execute, run_cli, Cli, Commands};
