//! Gallerystream - multi-resolution image streaming for 3D galleries
//!
//! This library decides, for every image plane in a 3D scene, which
//! resolution variant to fetch, when to fetch it, and how many fetches may be
//! in flight while the camera moves.
//!
//! # Architecture
//!
//! ```text
//! QualitySelector ──► StreamingSession ──► LoadQueue (thumbnail | full) ──► BlobCache ──► Fetcher
//!        ▲                                        ▲
//!        │ distance / select()                    │ external override
//!   scene renderer                         MovementThrottle ◄── camera speed
//! ```
//!
//! - [`cache`]: persistent byte cache with retention and version wipe
//! - [`queue`]: bounded-concurrency priority load queues with a watchdog
//! - [`throttle`]: camera movement detection driving queue concurrency
//! - [`quality`]: per-asset tier selection with hysteresis
//! - [`session`]: lifetime-scoped wiring of all of the above

pub mod cache;
pub mod config;
pub mod fetch;
pub mod geometry;
pub mod logging;
pub mod quality;
pub mod queue;
pub mod resource;
pub mod session;
pub mod throttle;

/// Library version, as reported by the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
