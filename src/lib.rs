//! # docqa
//!
//! Grounded question answering over a folder of documents.
//!
//! docqa ingests the `.pdf` and `.txt` files in a directory, splits them
//! into overlapping chunks, embeds the chunks, and serves top-k similarity
//! retrieval feeding a language-model composer that answers questions with
//! citations back to the source files.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌───────────┐   ┌──────────────┐
//! │  Loaders  │──▶│ Chunker  │──▶│ Embedding │──▶│ Vector Index │
//! │ .pdf .txt │   │ overlap  │   │ provider  │   │  (in-memory) │
//! └───────────┘   └──────────┘   └───────────┘   └──────┬───────┘
//!        rebuild gated on corpus fingerprint            │ top-k
//!                                                ┌──────▼───────┐
//!                                                │   Composer   │
//!                                                │ answer+cites │
//!                                                └──────────────┘
//! ```
//!
//! The rebuild gate is explicit: a SHA-256 fingerprint over the sorted
//! document filenames decides whether a query can reuse the session's
//! existing index or must rebuild it first. See [`pipeline`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Error taxonomy with retryability classification |
//! | [`models`] | Core data types |
//! | [`loader`] | Extension-dispatched document loading |
//! | [`chunk`] | Hierarchical overlap chunker |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | In-memory cosine-similarity index |
//! | [`pipeline`] | Session state, change detection, retrieval, `ask` |
//! | [`compose`] | Answer composer abstraction |

pub mod chunk;
pub mod compose;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod loader;
pub mod models;
pub mod pipeline;
