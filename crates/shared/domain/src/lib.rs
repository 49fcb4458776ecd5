//! # Domain Models
//!
//! Plain data shared by the bootstrap kernel, the built-in hooks and the
//! binaries: the decoded [`settings::Settings`], the lifecycle
//! [`signals`] published during a load, and a handful of constants.
//! Keep it lean: no I/O and no orchestration, just data and small helpers.

pub mod constants;
pub mod settings;
pub mod signals;
