pub mod attrs;
pub mod guest;
pub mod host;
pub mod report;
