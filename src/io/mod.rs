/// CSV export of market and plant telemetry.
pub mod export;
