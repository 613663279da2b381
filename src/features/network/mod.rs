mod collector;
mod models;

pub use collector::NetworkSource;
pub use models::NetworkReading;
