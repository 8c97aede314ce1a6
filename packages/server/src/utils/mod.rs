pub mod hackathon;
pub mod hash;
pub mod http_trace;
pub mod jwt;
pub mod project;
pub mod team;
pub mod user;
