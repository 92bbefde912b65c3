pub mod clean;
pub mod features;
pub mod record;
pub mod stats;
