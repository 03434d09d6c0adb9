//! # zql-hub — The ZQL Conversion Gateway
//!
//! HTTP front end for `zql-core`: `/convert?type=<target>&zql=<query>[&prefix=<p>]`
//! answers with a `{state, msg, data}` envelope, and every other path is
//! served from a static directory.

pub mod config;
pub mod gateway;
pub mod server;
