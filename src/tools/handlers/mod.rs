mod analysis;
mod browser;
mod budget_cache;
mod console;
mod debugger;
mod hooks;
mod network;
mod script_catalog;
mod util;

use super::registry::ToolRegistryBuilder;

pub fn register_all(reg: &mut ToolRegistryBuilder) {
    browser::register(reg);
    debugger::register(reg);
    network::register(reg);
    console::register(reg);
    script_catalog::register(reg);
    hooks::register(reg);
    budget_cache::register(reg);
    analysis::register(reg);
}
