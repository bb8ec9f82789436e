pub mod events;
pub mod policy;
pub mod settings;
pub mod update;

pub use events::*;
pub use policy::*;
pub use settings::*;
pub use update::*;
