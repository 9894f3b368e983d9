//! Ingest side: accepting probe connections and reading frames off them

pub mod acceptor;
pub mod connection;

pub use acceptor::ConnectionAcceptor;
pub use connection::{ConnectionContext, ConnectionEnd};
