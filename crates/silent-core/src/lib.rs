//! Core types and primitives shared by the silent OT crates.

#![deny(
    unsafe_code,
    missing_docs,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all
)]

pub mod aes;
pub mod block;
pub mod prg;
pub mod utils;

pub use block::Block;
