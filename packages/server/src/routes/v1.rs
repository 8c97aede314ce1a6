use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/hackathons", hackathon_routes())
        .nest("/teams", team_routes())
        .nest("/join-requests", join_request_routes())
        .nest("/projects", project_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::user::list_users))
        .routes(routes!(handlers::user::update_me))
        .routes(routes!(handlers::user::get_user))
        .routes(routes!(handlers::user::update_role))
}

fn hackathon_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::hackathon::list_hackathons,
            handlers::hackathon::create_hackathon
        ))
        .routes(routes!(
            handlers::hackathon::get_hackathon,
            handlers::hackathon::update_hackathon,
            handlers::hackathon::delete_hackathon
        ))
        .routes(routes!(
            handlers::hackathon::register,
            handlers::hackathon::unregister
        ))
        .routes(routes!(handlers::hackathon::set_ready))
        .routes(routes!(handlers::hackathon::list_participants))
        .routes(routes!(
            handlers::team::list_teams,
            handlers::team::create_team
        ))
        .routes(routes!(handlers::join_request::send_join_request))
}

fn team_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::team::get_team, handlers::team::update_team))
        .routes(routes!(handlers::team::leave_team))
        .routes(routes!(handlers::team::remove_member))
}

fn join_request_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::join_request::list_join_requests))
        .routes(routes!(handlers::join_request::accept_join_request))
        .routes(routes!(handlers::join_request::reject_join_request))
        .routes(routes!(handlers::join_request::withdraw_join_request))
}

fn project_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::project::list_projects,
            handlers::project::create_project
        ))
        .routes(routes!(
            handlers::project::get_project,
            handlers::project::update_project,
            handlers::project::delete_project
        ))
        .routes(routes!(handlers::task::list_tasks, handlers::task::create_task))
        .routes(routes!(handlers::task::update_task, handlers::task::delete_task))
}
