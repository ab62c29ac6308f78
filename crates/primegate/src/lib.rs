#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod bound;
mod cache;
mod config;
mod error;
mod expiring;
mod gate;
mod generator;
mod service;
mod time;

pub use crate::bound::*;
pub use crate::cache::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::expiring::*;
pub use crate::gate::*;
pub use crate::generator::*;
pub use crate::service::*;
pub use crate::time::*;
