//! Classic concurrency patterns built from the `foundation_sync` primitives.
//!
//! - Bounded producer-consumer queue over [`Synchronized`](foundation_sync::Synchronized)
//!   and [`AnyCondVar`](foundation_sync::AnyCondVar)
//! - Reusable barrier over [`Lock`](foundation_sync::Lock) and
//!   [`CondVar`](foundation_sync::CondVar)

pub mod barrier;
pub mod producer_consumer;

pub use barrier::Barrier;
pub use producer_consumer::BoundedQueue;
