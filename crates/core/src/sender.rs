//! Contracts implemented by platform adapters at the manager's edge.

/// Converts between a platform sender and the core's typed sender.
///
/// The core is parameterised exactly once per manager; adapters that receive
/// foreign sender objects map them at the boundary instead of downcasting
/// inside the engine.
pub trait SenderMapper<From, To>: Send + Sync {
    fn map_into(&self, sender: From) -> To;
    fn map_back(&self, sender: To) -> From;
}

/// Mapper for adapters whose platform sender is already the core sender.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityMapper;

impl<T> SenderMapper<T, T> for IdentityMapper {
    fn map_into(&self, sender: T) -> T {
        sender
    }

    fn map_back(&self, sender: T) -> T {
        sender
    }
}

/// Summary of a registered command, handed to registration sinks and the
/// introspection surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSummary {
    /// Top-level literal name.
    pub name: String,
    /// Aliases of the top-level literal.
    pub aliases: Vec<String>,
    /// Description supplied on the root component, if any.
    pub description: Option<String>,
    /// Rendered syntax line, for help-layer consumers.
    pub syntax: String,
}

/// Notified on every successful registration so adapters can mirror commands
/// into external dispatchers. Returning an error fails the registration and
/// leaves the tree unchanged.
pub trait RegistrationSink<S>: Send + Sync {
    fn command_registered(&self, command: &CommandSummary) -> anyhow::Result<()>;
}
