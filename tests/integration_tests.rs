//! Integration tests for FXLens.
//!
//! `integration` exercises the library: curated query resolution, the
//! dashboard against the sample database, and PostgreSQL execution when
//! `DATABASE_URL` is set. `cli` drives the compiled binary.

mod cli;
mod integration;
