//! Frontline - deferred military conflict engine for a persistent
//! geopolitical simulation

pub mod core;
pub mod military;
pub mod nation;
