//! # Throttled Chunk Executor
//!
//! A fixed-size group of worker tasks fed from one queue. A semaphore with
//! `throttle_limit` permits bounds the chunks in flight: `submit` waits for
//! a permit, the permit travels with the chunk, and it is released when the
//! chunk's writer returns.
//!
//! ```text
//! submit ─[permit]─▶ queue ─▶ worker 1..T ─▶ processor ─▶ writer ─▶ ChunkHandle
//! ```
//!
//! Lifecycle: `Initialized → Accepting → Draining → Terminated`.

pub mod chunk_result;
pub mod throttled;

pub use chunk_result::ChunkResult;
pub use throttled::{current_worker, ChunkHandle, PoolLifecycle, ThrottledExecutor, WorkerPoolState};
