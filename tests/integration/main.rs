//! Integration tests: full fetch → ingest → evaluate → report cycles over
//! an in-memory provider and an in-memory SQLite store.

mod mock_provider;
mod pipeline;
