//! Skeleton Web Application
//!
//! Serves the user API and the `public/` directory, which also holds the
//! acceptance-test trace artifacts under `behat_trace/`.

pub mod server;
