//! Unit tests for the history-file encodings.

mod column_tests;
