//! Procedural racetrack generation and an evolutionary pool of ray-sensing
//! cars learning to drive it.
//!
//! The core is synchronous and renderer-agnostic: [`pool::Pool::tick`] is
//! driven once per frame by a host, and everything it exposes is plain data.

pub mod car;
pub mod config;
pub mod course;
pub mod curve;
pub mod genome;
pub mod geometry;
pub mod hull;
pub mod mask;
pub mod network;
pub mod pool;
pub mod sensory;
pub mod stats;
pub mod track;
pub mod world;

pub use car::{Car, CarTelemetry, CrashReason, DriveError, DrivePolicy};
pub use config::{ConfigError, SimConfig};
pub use course::Course;
pub use genome::{AngleGenome, Genome, GenomeError, NetworkGenome};
pub use pool::{Pool, PoolError, PoolEvent, PoolSnapshot};
pub use track::{Track, TrackError};
