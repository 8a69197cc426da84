//! Test helper utilities

pub mod db_utils;

#[allow(unused_imports)]
pub use db_utils::{
    create_test_db, feature, feature_json, mapping, run_import_tx, seed_category, seed_project,
    square,
};
