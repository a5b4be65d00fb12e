// Composition root for the attendance sync.
//
// Responsibilities
// - Read config from the environment.
// - Instantiate the Personio, monday.com and identity store adapters.
// - Wire them into the batch runner and the scheduler.
// - Serve liveness and run health over HTTP.

pub mod config;
pub mod http;
pub mod scheduler;
pub mod state;
