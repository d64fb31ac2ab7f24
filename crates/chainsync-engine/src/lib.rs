//! chainsync-engine — the incremental sync cycle for one watched account.
//!
//! A cycle reads the stored watermark, asks the node for its tip, fetches
//! every block in between, keeps the watched address's transactions and
//! commits them before advancing the watermark.

pub mod builder;
pub mod engine;

pub use builder::SyncEngineBuilder;
pub use engine::SyncEngine;
