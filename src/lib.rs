mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod payload;
    pub mod schema;
    pub mod seed;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod cache {
    pub mod cache;
}

mod shopping {
    pub mod aggregation;
}

pub mod api {
    pub mod catalog;
    pub mod recipes;
    pub mod reply;
    pub mod routes;
    pub mod state;
    pub mod users;
}
pub mod config;
pub mod media;

pub use authentication::*;
pub use cache::cache::*;
pub use constants::*;
pub use database::*;
pub use shopping::aggregation::*;
