pub mod auth;
pub mod hackathon;
pub mod join_request;
pub mod project;
pub mod shared;
pub mod task;
pub mod team;
pub mod user;
