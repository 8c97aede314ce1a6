pub mod enums;
pub mod hackathon;
pub mod hackathon_participant;
pub mod join_request;
pub mod project;
pub mod role;
pub mod role_permission;
pub mod task;
pub mod team;
pub mod team_member;
pub mod user;
pub mod user_skill;
