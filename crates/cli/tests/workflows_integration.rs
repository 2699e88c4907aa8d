//! Integration tests for benzen

mod common;
mod workflows;
