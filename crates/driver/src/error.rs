pub use sentinel_types::DriverError;
