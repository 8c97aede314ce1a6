use serde_json::json;

use crate::common::{TestApp, TestUser, routes};

/// An organizer's hackathon with `names` registered as participants.
async fn hackathon_with(app: &TestApp, max_team_size: i32, names: &[&str]) -> (i32, Vec<TestUser>) {
    let olga = app.create_user_with_role("olga", "organizer").await;
    let id = app.create_hackathon(&olga.token, "Rust Jam", max_team_size).await;
    let mut users = Vec::new();
    for name in names {
        let user = app.create_user(name).await;
        app.register_for_hackathon(id, &user.token).await;
        users.push(user);
    }
    (id, users)
}

/// Invite `user` into the leader's team and accept on their behalf.
async fn recruit(app: &TestApp, hackathon_id: i32, leader: &TestUser, user: &TestUser) {
    let req = app.send_join_request(hackathon_id, &leader.token, user.id).await;
    let res = app
        .post_with_token(&routes::join_request_accept(req), &json!({}), &user.token)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
}

mod create {
    use super::*;

    #[tokio::test]
    async fn creator_becomes_the_leader() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice"]).await;
        let alice = &users[0];
        app.put_with_token(&routes::hackathon_ready(id), &json!({"ready": true}), &alice.token)
            .await;

        let res = app
            .post_with_token(
                &routes::hackathon_teams(id),
                &json!({"name": "  Crabs  "}),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "Crabs");
        assert_eq!(res.body["hackathon_id"], id);
        assert_eq!(res.body["leader_id"], alice.id);
        assert_eq!(res.body["members"][0]["username"], "alice");

        let ready = app
            .get_with_token(
                &format!("{}?ready=true", routes::hackathon_participants(id)),
                &alice.token,
            )
            .await;
        assert_eq!(ready.body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn names_are_unique_per_hackathon_ignoring_case() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice", "bob"]).await;
        app.create_team(id, &users[0].token, "Crabs").await;

        let res = app
            .post_with_token(&routes::hackathon_teams(id), &json!({"name": "CRABS"}), &users[1].token)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn same_name_is_fine_in_another_hackathon() {
        let app = TestApp::spawn().await;
        let (first, users) = hackathon_with(&app, 3, &["alice"]).await;
        let olga = app.login("olga").await;
        let second = app.create_hackathon(&olga, "Go Jam", 3).await;
        app.register_for_hackathon(second, &users[0].token).await;
        app.create_team(first, &users[0].token, "Crabs").await;

        let res = app
            .post_with_token(&routes::hackathon_teams(second), &json!({"name": "Crabs"}), &users[0].token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn one_team_per_participant() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice"]).await;
        app.create_team(id, &users[0].token, "Crabs").await;

        let res = app
            .post_with_token(&routes::hackathon_teams(id), &json!({"name": "Ferris"}), &users[0].token)
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn unregistered_users_cannot_create_teams() {
        let app = TestApp::spawn().await;
        let (id, _) = hackathon_with(&app, 3, &[]).await;
        let zed = app.create_user("zed").await;

        let res = app
            .post_with_token(&routes::hackathon_teams(id), &json!({"name": "Solo"}), &zed.token)
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice"]).await;

        let res = app
            .post_with_token(&routes::hackathon_teams(id), &json!({"name": "   "}), &users[0].token)
            .await;

        assert_eq!(res.status, 400);
    }
}

mod read {
    use super::*;

    #[tokio::test]
    async fn lists_teams_with_members_in_join_order() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice", "bob", "carol"]).await;
        let team_id = app.create_team(id, &users[0].token, "Crabs").await;
        recruit(&app, id, &users[0], &users[1]).await;
        app.create_team(id, &users[2].token, "Gophers").await;

        let list = app
            .get_with_token(&routes::hackathon_teams(id), &users[2].token)
            .await;
        assert_eq!(list.status, 200);
        assert_eq!(list.body.as_array().unwrap().len(), 2);

        let team = app.get_with_token(&routes::team(team_id), &users[2].token).await;
        assert_eq!(team.status, 200);
        let members: Vec<&str> = team.body["members"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["username"].as_str().unwrap())
            .collect();
        assert_eq!(members, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn missing_team_is_404() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app.get_with_token(&routes::team(999), &alice.token).await;

        assert_eq!(res.status, 404);
    }
}

mod rename {
    use super::*;

    #[tokio::test]
    async fn only_the_leader_renames() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice", "bob"]).await;
        let team_id = app.create_team(id, &users[0].token, "Crabs").await;
        recruit(&app, id, &users[0], &users[1]).await;

        let denied = app
            .patch_with_token(&routes::team(team_id), &json!({"name": "Bob's"}), &users[1].token)
            .await;
        assert_eq!(denied.status, 403);

        let res = app
            .patch_with_token(&routes::team(team_id), &json!({"name": "Ferris"}), &users[0].token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Ferris");
    }

    #[tokio::test]
    async fn renaming_to_own_name_in_other_case_is_allowed() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice"]).await;
        let team_id = app.create_team(id, &users[0].token, "Crabs").await;

        let res = app
            .patch_with_token(&routes::team(team_id), &json!({"name": "CRABS"}), &users[0].token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn renaming_onto_another_team_conflicts() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice", "bob"]).await;
        let team_id = app.create_team(id, &users[0].token, "Crabs").await;
        app.create_team(id, &users[1].token, "Gophers").await;

        let res = app
            .patch_with_token(&routes::team(team_id), &json!({"name": "gophers"}), &users[0].token)
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn second_rename_onto_a_renamed_team_conflicts() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice", "bob"]).await;
        let crabs = app.create_team(id, &users[0].token, "Crabs").await;
        let gophers = app.create_team(id, &users[1].token, "Gophers").await;

        let first = app
            .patch_with_token(&routes::team(crabs), &json!({"name": "Foo"}), &users[0].token)
            .await;
        let second = app
            .patch_with_token(&routes::team(gophers), &json!({"name": "foo"}), &users[1].token)
            .await;

        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(second.status, 409);
        let list = app
            .get_with_token(&routes::hackathon_teams(id), &users[1].token)
            .await;
        let names: Vec<&str> = list
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Foo", "Gophers"]);
    }

    #[tokio::test]
    async fn renaming_a_missing_team_is_404() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app
            .patch_with_token(&routes::team(999), &json!({"name": "Ghosts"}), &alice.token)
            .await;

        assert_eq!(res.status, 404);
    }
}

mod membership {
    use super::*;

    #[tokio::test]
    async fn leader_leaving_hands_over_to_earliest_member() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 4, &["alice", "bob", "carol"]).await;
        let team_id = app.create_team(id, &users[0].token, "Crabs").await;
        recruit(&app, id, &users[0], &users[1]).await;
        recruit(&app, id, &users[0], &users[2]).await;

        let res = app
            .post_with_token(&routes::team_leave(team_id), &json!({}), &users[0].token)
            .await;
        assert_eq!(res.status, 204, "{}", res.text);

        let team = app.get_with_token(&routes::team(team_id), &users[1].token).await;
        assert_eq!(team.body["leader_id"], users[1].id);
        assert_eq!(team.body["members"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn last_member_leaving_dissolves_the_team() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice", "bob"]).await;
        let team_id = app.create_team(id, &users[0].token, "Crabs").await;
        let project_id = app
            .create_project(&users[0].token, json!({"title": "Matcher", "team_id": team_id}))
            .await;
        app.send_join_request(id, &users[1].token, users[0].id).await;

        let res = app
            .post_with_token(&routes::team_leave(team_id), &json!({}), &users[0].token)
            .await;
        assert_eq!(res.status, 204);

        let team = app.get_with_token(&routes::team(team_id), &users[0].token).await;
        assert_eq!(team.status, 404);

        let outbox = app
            .get_with_token(
                &format!("{}?direction=outgoing", routes::JOIN_REQUESTS),
                &users[1].token,
            )
            .await;
        assert_eq!(outbox.body.as_array().unwrap().len(), 0);

        let project = app
            .get_with_token(&routes::project(project_id), &users[0].token)
            .await;
        assert_eq!(project.status, 200);
        assert_eq!(project.body["team_id"], json!(null));
        assert_eq!(project.body["hackathon_id"], id);

        let again = app
            .post_with_token(&routes::hackathon_teams(id), &json!({"name": "Crabs"}), &users[0].token)
            .await;
        assert_eq!(again.status, 201);
    }

    #[tokio::test]
    async fn outsiders_cannot_leave() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice", "bob"]).await;
        let team_id = app.create_team(id, &users[0].token, "Crabs").await;

        let res = app
            .post_with_token(&routes::team_leave(team_id), &json!({}), &users[1].token)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn leader_removes_a_member() {
        let app = TestApp::spawn().await;
        let (id, users) = hackathon_with(&app, 3, &["alice", "bob", "carol"]).await;
        let team_id = app.create_team(id, &users[0].token, "Crabs").await;
        recruit(&app, id, &users[0], &users[1]).await;

        let not_leader = app
            .delete_with_token(&routes::team_member(team_id, users[0].id), &users[1].token)
            .await;
        assert_eq!(not_leader.status, 403);

        let self_remove = app
            .delete_with_token(&routes::team_member(team_id, users[0].id), &users[0].token)
            .await;
        assert_eq!(self_remove.status, 400);

        let stranger = app
            .delete_with_token(&routes::team_member(team_id, users[2].id), &users[0].token)
            .await;
        assert_eq!(stranger.status, 404);

        let res = app
            .delete_with_token(&routes::team_member(team_id, users[1].id), &users[0].token)
            .await;
        assert_eq!(res.status, 204);

        let team = app.get_with_token(&routes::team(team_id), &users[0].token).await;
        assert_eq!(team.body["members"].as_array().unwrap().len(), 1);

        let unassigned = app
            .get_with_token(
                &format!("{}?unassigned=true", routes::hackathon_participants(id)),
                &users[0].token,
            )
            .await;
        assert_eq!(unassigned.body.as_array().unwrap().len(), 2);
    }
}
