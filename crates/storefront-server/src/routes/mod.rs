pub mod analytics;
pub mod events;
pub mod health;
pub mod pageview;
