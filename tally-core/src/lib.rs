pub mod counters;
pub mod events;
pub mod identity;
pub mod rate_limit;
pub mod sampling;
pub mod settings;
pub mod tenants;
pub mod utils;
