//! # Flowrun Agents
//!
//! Built-in [`Agent`](flowrun_engine::Agent) implementations for the flowrun
//! engine. These cover the common step shapes embedders reach for first and
//! double as fixtures for engine tests and examples:
//!
//! - [`EchoAgent`] — returns its input unchanged
//! - [`MathAgent`] — basic arithmetic over two operands
//! - [`TransformAgent`] — `{{key}}` template substitution from input and context
//! - [`DelayAgent`] — sleeps for a requested duration
//! - [`FailAgent`] — always fails, for exercising failure paths
//! - [`HttpRequestAgent`] — JSON-in/JSON-out HTTP requests
//!
//! Register any of them on an engine:
//!
//! ```ignore
//! let engine = Engine::in_memory();
//! engine.register_agent(Arc::new(EchoAgent));
//! engine.register_agent(Arc::new(MathAgent));
//! ```

mod delay;
mod echo;
mod fail;
mod http;
mod math;
mod transform;

pub use delay::DelayAgent;
pub use echo::EchoAgent;
pub use fail::FailAgent;
pub use http::HttpRequestAgent;
pub use math::MathAgent;
pub use transform::TransformAgent;
