//! Command implementations.

pub mod analyze;
pub mod backup;
pub mod context;
pub mod extract;
pub mod records;
pub mod settings;

pub use self::analyze::{execute_analyze, execute_remove_photo};
pub use self::backup::{execute_export, execute_import};
pub use self::context::execute_context;
pub use self::extract::execute_extract;
pub use self::records::{execute_delete, execute_list, execute_show};
pub use self::settings::execute_config;
