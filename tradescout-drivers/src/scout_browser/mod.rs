pub mod driver;
pub mod pacing;
pub mod stealth;
pub mod wait;
