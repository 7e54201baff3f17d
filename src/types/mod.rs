//! Core type definitions: ports, port specifications and target hosts.

mod port;
mod target;

pub use port::{resolve, ExclusionSet, Port, PortError, PortRange, PortSpec};
pub use target::{system_resolver, Host, TargetError, TargetSpec};
