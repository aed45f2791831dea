//! Agent abstractions
//!
//! An agent is an external capability unit identified by an id, invoked by a
//! step with `(input, context) -> output`. The engine imposes no schema on
//! input or output beyond "serializable value".

mod definition;
mod registry;

pub use definition::{Agent, AgentError, AgentInfo};
pub use registry::AgentRegistry;
