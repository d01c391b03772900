/*
 * This module provides the application logic layer, centered around
 * `LauncherLogic`, which front ends drive with a `LauncherCommand` and an output
 * writer. Unit tests for `LauncherLogic` are in `handler_tests.rs`.
 */
pub mod handler;


pub use handler::{
    HandlerError, LauncherCommand, LauncherLogic, OutputFormat, describe_read_error,
};
