//! Cleaning and aggregation algorithms for the HES pipeline.

pub mod collapse;
pub mod dates;
