//! Core type definitions using newtype patterns for type safety.

mod port;
mod target;

pub use port::{Port, PortError, PortSpec};
pub use target::{parse_host_list, Target, TargetError, TargetSet};
