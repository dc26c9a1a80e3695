pub mod config;
pub mod input;

pub use config::AppConfig;
pub use input::{Callbacks, EngineEvent, EngineHandle, EngineSettings, NavigationEvent, Orientation};
