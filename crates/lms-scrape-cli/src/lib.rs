//! Command-line front end: scrape LMS course pages into the JSON wire format.

pub mod config;
pub mod output;
