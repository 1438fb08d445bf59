pub mod config;
pub mod emitter;
pub mod error;
pub mod logging;
pub mod observer;
pub mod pacing;
pub mod packet;
pub mod plan;
pub mod preset;
pub mod prompt;
pub mod summary;
pub mod target;

pub use config::EmitterConfig;
pub use emitter::{emit, Emitter};
pub use error::{ConfigError, EmitError};
pub use observer::{EmitObserver, LoggingObserver};
pub use packet::CounterPacket;
pub use pacing::Pacing;
pub use plan::{EmitPlan, StopCondition};
pub use summary::{EmitSummary, Progress};
