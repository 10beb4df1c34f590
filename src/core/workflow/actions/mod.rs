pub mod command;
pub mod echo;
pub mod noop;

use crate::core::workflow::action::ActionRegistryBuilder;
use std::sync::Arc;

#[derive(Default)]
pub struct BuiltinActionDeps {
    pub command_runner: Option<Arc<dyn command::CommandRunner>>,
}

/// Register built-in actions into the supplied builder.
pub fn register_builtins(builder: &mut ActionRegistryBuilder) {
    register_builtins_with_deps(builder, BuiltinActionDeps::default());
}

pub fn register_builtins_with_deps(builder: &mut ActionRegistryBuilder, deps: BuiltinActionDeps) {
    let command_action = match deps.command_runner {
        Some(runner) => command::CommandAction::with_runner(runner),
        None => command::CommandAction::new(),
    };
    builder
        .register(noop::NoOpAction::new())
        .register(echo::EchoAction::new())
        .register(command_action);
}
