//! # docchat
//!
//! A retrieval-augmented document chat service.
//!
//! docchat ingests documents (PDF/DOCX/TXT) from a local directory, splits
//! them into overlapping chunks, embeds the chunks, and stores the vectors
//! in a persistent SQLite index. At question time it retrieves the nearest
//! chunks for the query, assembles an augmented prompt, and forwards it to
//! a hosted chat model, returning the reply over a small JSON API or the
//! CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────┐   ┌──────────┐
//! │ documents │──▶│     Pipeline     │──▶│  SQLite  │
//! │ pdf/docx/ │   │ extract → chunk  │   │  vector  │
//! │   txt     │   │  → embed → store │   │  index   │
//! └───────────┘   └──────────────────┘   └────┬─────┘
//!                                             │
//!                        query ──▶ retrieve ──┤
//!                                             ▼
//!                                   ┌──────────────────┐
//!                                   │ prompt assembly  │──▶ chat model
//!                                   └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`chunk`] | Fixed-size overlapping text chunking |
//! | [`metadata`] | Flat-file metadata store and change detection |
//! | [`extract`] | PDF/DOCX/TXT text extraction |
//! | [`embedding`] | Embedding collaborator abstraction |
//! | [`store`] | Persistent vector index over SQLite |
//! | [`pipeline`] | Document processing orchestration |
//! | [`retrieve`] | Query-time nearest-neighbor retrieval |
//! | [`chat`] | Session state, prompt assembly, chat-model call |
//! | [`server`] | JSON HTTP API |
//! | [`status`] | Corpus summary |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod metadata;
pub mod models;
pub mod pipeline;
pub mod retrieve;
pub mod server;
pub mod status;
pub mod store;
