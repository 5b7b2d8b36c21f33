//! SQLite backend for the storefront engine.
//!
//! The low-level query functions in [`db`] take a `&mut SqliteConnection` so that composite
//! operations can nest them inside a single transaction. [`SqliteDatabase`] owns the pool and is
//! the place where transactions begin and commit.

pub mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;
