// Client module - talks to the remote tracking service

pub mod data_client;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use data_client::DataClient;
pub use transport::{BodyStream, HttpTransport, Transport, WireResponse};
