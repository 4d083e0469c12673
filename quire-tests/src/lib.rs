//! Integration tests for `quire`, see the `tests` directory.
