//! Playback Adapter - 播放 sink 实现

mod memory_sink;
mod process_sink;

pub use memory_sink::{MemorySink, SinkOp};
pub use process_sink::ProcessSink;
