//! Administrative management of training sessions.

pub mod directory;

pub use directory::SessionDirectory;
