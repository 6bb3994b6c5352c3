pub mod client_identity;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod middleware;
pub mod params;
pub mod path_template;
pub mod rate_limit_config;
pub mod rate_limiter;
pub mod response;
pub mod route;
pub mod route_table;
pub mod server;

pub use client_identity::{client_identity, ClientOrigin};
pub use config::Config;
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::{CompileError, ConfigError, ParamError, RegistrationError};
pub use params::Params;
pub use path_template::PathTemplate;
pub use rate_limit_config::RateLimiterConfig;
pub use rate_limiter::RateLimiter;
pub use route::{Method, Route};
pub use route_table::RouteTable;
pub use server::create_app;
