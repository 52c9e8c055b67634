pub mod export;
pub mod import;

pub use export::run_export;
pub use import::run_import;
