pub mod api;
pub mod config;
pub mod export;
pub mod fpl_fetch;
pub mod http_cache;
pub mod http_client;
pub mod metrics;
pub mod mini_league;
pub mod model;
pub mod provider;
pub mod rankings;
pub mod state;
pub mod team_review;
