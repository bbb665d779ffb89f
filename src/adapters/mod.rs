// Adapters layer: concrete collaborators plugged into the core (discovery, built-in services).

pub mod discovery;
pub mod status;

pub use discovery::StaticDiscovery;
pub use status::StatusService;
