//! Intentionally empty. The integration tests live in `tests/`.
