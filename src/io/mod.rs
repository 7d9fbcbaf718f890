pub mod config_io;
pub mod lock;
pub mod recovery;
pub mod store;
pub mod store_io;
