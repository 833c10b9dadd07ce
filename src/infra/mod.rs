pub mod auth;
pub mod boot;
pub mod config;
pub mod http_app;
pub mod logging;
pub mod http {
    pub mod client;
    pub mod headers;
}
pub mod runtime;
