mod cli_test;
mod common;
