//! Gateway: the JSON-RPC dispatcher and its HTTP front end

mod dispatcher;
mod router;
mod server;

pub use dispatcher::Dispatcher;
pub use server::Gateway;
