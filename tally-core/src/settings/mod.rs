pub mod api_server;
pub mod ingest;
pub mod sampling;
pub mod scheduler_interval;
