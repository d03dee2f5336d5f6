//! Standard-stream transport. The HTTP transport lives in [`crate::gateway`].

mod stdio;

pub use self::stdio::{serve_lines, serve_stdio};
