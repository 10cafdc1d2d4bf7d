//! # Matchup
//!
//! Dual-sensor spatio-temporal collocation.
//!
//! Responsibilities:
//! - Read primary observations for a window and secondary observations for
//!   the window widened by the usecase time delta
//! - Pair each primary with its best secondary within the time and distance
//!   thresholds
//! - Project usecase variables into `MatchupRecord`s
//!
//! ## Usage Example
//!
//! ```ignore
//! use matchup::MatchupEngine;
//!
//! let engine = MatchupEngine::new(reader);
//! let records = engine.matchup(&primary, &secondary, &window, rules).await?;
//! ```

mod collocate;
mod engine;
mod geo;

pub use collocate::{collocate, MatchCriteria};
pub use engine::MatchupEngine;
pub use geo::{haversine_km, is_valid_position, EARTH_RADIUS_KM};
