pub mod config;
pub mod database;
pub mod netutils;
pub mod service;
pub mod shutdown;

pub use crate::config::*;
pub use crate::shutdown::*;

pub mod prelude {
    pub use crate::database::*;
    pub use crate::service::*;
}
