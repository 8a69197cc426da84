//! Database access shared by the LotMap services

pub mod init;

pub use init::init_database;
