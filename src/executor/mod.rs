pub mod installer;

pub use installer::{install_artifact, ArtifactKind, InstallOutcome};
