pub mod config;
pub mod flow;
pub mod provider;
pub mod schedule;

pub use config::RuntimeConfig;
pub use flow::error::{FlowError, FlowResult};
pub use flow::registry::ConfigRegistry;
pub use provider::CallProvider;
