//! Pre-game forecasts for college football matchups: win probability, point spread and total,
//! derived from a blend of opponent-adjusted efficiency, market consensus, ratings, player impact
//! and situational context, together with the betting edges the forecast implies.

#![allow(clippy::too_many_arguments)]

pub mod aggregate;
pub mod calibrate;
pub mod confidence;
pub mod config;
pub mod context;
pub mod convert;
pub mod domain;
pub mod file;
pub mod forecast;
pub mod form;
pub mod market;
pub mod metrics;
pub mod opt;
pub mod player;
pub mod print;
pub mod reference;
pub mod rules;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../../README.md")]
#[cfg(doc)]
fn readme() {}
