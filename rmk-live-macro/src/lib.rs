#![doc = include_str!("../../README.md")]
//! ## Feature flags
#![doc = document_features::document_features!()]
#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod console;
pub mod event;
pub mod host;
pub mod indicator;
pub mod keycode;
pub mod keymap;
pub mod live_macro;
pub mod storage;

pub use config::LiveMacroConfig;
pub use event::{KeyAddr, KeyEvent, ProcessResult};
pub use host::MacroHost;
pub use live_macro::LiveMacro;
pub use storage::MacroStore;
