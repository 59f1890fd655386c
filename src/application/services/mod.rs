//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (ContainerDriver, Prompter, etc.)
//! but are themselves concrete structs, not traits.

mod export;

pub use export::ExportService;
