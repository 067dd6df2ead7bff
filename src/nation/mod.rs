//! Nation-side collaborators: treasury, government, geography, casus belli

pub mod directory;
pub mod political;

pub use directory::{CasusBelliRegistry, Nation, NationDirectory, NationRegistry, WarPolicy};
pub use political::PoliticalSystem;
