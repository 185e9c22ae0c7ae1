//! # Strata Development Tools
//!
//! Command-line tools for development:
//! - Content validator (runs the full load pipeline and reports diagnostics)
//! - Missile arena (fires one missile and traces it tick by tick)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod simulate;
pub mod validate;
