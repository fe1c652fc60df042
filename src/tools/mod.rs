pub mod catalog;
pub mod context;
mod handlers;
pub mod registry;

pub use context::ToolContext;
pub use registry::{ToolRegistry, ToolRegistryBuilder};

pub fn build_registry() -> ToolRegistry {
    let mut builder = ToolRegistryBuilder::new();
    handlers::register_all(&mut builder);
    builder.build()
}
