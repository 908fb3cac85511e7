//! HTTP protocol implementation.
//!
//! # Architecture
//!
//! - **`request`**: the parsed request and its incremental parse state
//! - **`parser`**: the CRLF-line state machine filling a request from a buffer
//! - **`response`**: status resolution and serialization, file-backed bodies
//! - **`mime`**: MIME type detection based on file extensions
//! - **`connection`**: one client socket plus its buffers and protocol state
//!
//! # Connection State Machine
//!
//! Each connection cycles through the same states, driven by readiness events
//! rather than by a task per connection:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← reactor reports readable, worker drains socket
//!        └──────┬──────┘
//!               │ full request buffered
//!               ▼
//!        ┌──────────────────┐
//!        │ Parse + Respond  │ ← synchronous, inside the read task
//!        └──────┬───────────┘
//!               │ response staged (headers + mapped file)
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← reactor reports writable, worker gathers out
//!        └──────┬───────────┘
//!               │ fully drained
//!               ├─ keep-alive → Reading (same connection)
//!               └─ close → socket released
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
