//! HTTP store endpoint exposing availability and purchase for both policy versions.

mod server;
mod service;

pub use server::{shutdown_signal, StoreServer};
pub use service::{
    router, Availability, ErrorBody, Ping, Purchase, StoreError, TimeQuery, Version,
    STORE_ERROR_MESSAGE,
};
