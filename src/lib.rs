//! The data transfer engine of a client for an HTTP/JSON array store.
//!
//! `restvol` moves hyperslab and point selections of multidimensional arrays between caller memory and a remote array store speaking a REST/JSON protocol.
//! It encodes selections to their wire forms, negotiates a binary or JSON transfer mode per element type, converts between caller and wire element types, scatters and gathers packed element streams into non-contiguous memory, and drives many transfers concurrently with retry and backoff.
//!
//! ## Getting Started
//! - [`client::ArrayClient`] is the entry point for reads and writes of [`client::RemoteArray`]s.
//! - [`selection`] describes which elements a transfer addresses.
//! - [`transport::Multiplexer`] is the seam for the HTTP layer. [`transport::ReqwestMultiplexer`] is provided with the `http` feature.
//! - [`config`] holds the global defaults for connection limits, polling and retries.
//!
//! ## Example
//! ```rust,no_run
//! # #[cfg(feature = "http")]
//! # {
//! use restvol::client::{ArrayClient, RemoteArray};
//! use restvol::selection::{Hyperslab, Selection};
//!
//! let mut client = ArrayClient::new_http("http://localhost:5101", "/home/test/file.h5")?;
//! let array = RemoteArray::from_descriptors(
//!     "d-c9b8f6a2",
//!     &serde_json::json!({"class": "H5T_INTEGER", "base": "H5T_STD_I32LE"}),
//!     &serde_json::json!({"class": "H5S_SIMPLE", "dims": [20]}),
//! )?;
//! let selection: Selection = Hyperslab::new(vec![10], vec![2], vec![5], vec![1])?.into();
//! let values: Vec<i32> = client.read_native(&array, selection)?;
//! println!("{values:?}");
//! # }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! #### Default
//!  - `http`: a [reqwest](https://docs.rs/reqwest) based [`Multiplexer`](transport::Multiplexer).
//!
//! ## Threading
//! Transfers are submitted, scheduled and completed on the calling thread.
//! With the `http` feature, [`transport::ReqwestMultiplexer`] executes each poll batch on [rayon](https://docs.rs/rayon) worker threads, at most [`max_connections_per_host`](config::Config::max_connections_per_host) at a time.
//! A custom [`transport::Multiplexer`] decides its own execution model.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
// #![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod client;
pub mod config;
pub mod conversion;
pub mod data_type;
pub mod negotiation;
pub mod scheduler;
pub mod selection;
pub mod transfer;
pub mod transport;
pub mod wire;

pub use client::{ArrayClient, ArrayClientError, RemoteArray};
pub use selection::{Dataspace, Hyperslab, PointSelection, Selection};
