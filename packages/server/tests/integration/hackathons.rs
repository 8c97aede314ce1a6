use serde_json::json;

use crate::common::{TestApp, routes};

fn hackathon_body(title: &str) -> serde_json::Value {
    json!({
        "title": title,
        "description": "Build something great.",
        "mode": "hybrid",
        "location": "Berlin",
        "prize": "$1000",
        "max_team_size": 3,
        "registration_deadline": "2099-01-01T00:00:00Z",
        "start_time": "2099-01-02T00:00:00Z",
        "end_time": "2099-01-04T00:00:00Z",
    })
}

mod create {
    use super::*;

    #[tokio::test]
    async fn organizer_can_create_a_hackathon() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;

        let res = app
            .post_with_token(routes::HACKATHONS, &hackathon_body("Rust Jam"), &olga.token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["title"], "Rust Jam");
        assert_eq!(res.body["organizer_id"], olga.id);
        assert_eq!(res.body["organizer_username"], "olga");
        assert_eq!(res.body["status"], "upcoming");
        assert_eq!(res.body["mode"], "hybrid");
        assert_eq!(res.body["participant_count"], 0);
    }

    #[tokio::test]
    async fn participants_cannot_create_hackathons() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app
            .post_with_token(routes::HACKATHONS, &hackathon_body("Nope"), &alice.token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn end_must_be_after_start() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let mut body = hackathon_body("Backwards");
        body["end_time"] = json!("2099-01-01T12:00:00Z");

        let res = app
            .post_with_token(routes::HACKATHONS, &body, &olga.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn team_size_outside_bounds_is_rejected() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let mut body = hackathon_body("Solo");
        body["max_team_size"] = json!(1);

        let res = app
            .post_with_token(routes::HACKATHONS, &body, &olga.token)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn unknown_mode_is_rejected() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let mut body = hackathon_body("Odd");
        body["mode"] = json!("underwater");

        let res = app
            .post_with_token(routes::HACKATHONS, &body, &olga.token)
            .await;

        assert_eq!(res.status, 400);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn lists_by_start_time_and_filters() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;

        let mut later = hackathon_body("Later Jam");
        later["start_time"] = json!("2099-02-02T00:00:00Z");
        later["end_time"] = json!("2099-02-04T00:00:00Z");
        later["mode"] = json!("online");
        app.post_with_token(routes::HACKATHONS, &later, &olga.token)
            .await;
        app.post_with_token(routes::HACKATHONS, &hackathon_body("Sooner Jam"), &olga.token)
            .await;
        let mut past = hackathon_body("Past Jam");
        past["registration_deadline"] = json!("2000-01-01T00:00:00Z");
        past["start_time"] = json!("2000-01-02T00:00:00Z");
        past["end_time"] = json!("2000-01-03T00:00:00Z");
        app.post_with_token(routes::HACKATHONS, &past, &olga.token)
            .await;

        let all = app.get_with_token(routes::HACKATHONS, &olga.token).await;
        assert_eq!(all.status, 200);
        let titles: Vec<&str> = all.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Past Jam", "Sooner Jam", "Later Jam"]);

        let upcoming = app
            .get_with_token(&format!("{}?status=upcoming", routes::HACKATHONS), &olga.token)
            .await;
        assert_eq!(upcoming.body["pagination"]["total"], 2);

        let completed = app
            .get_with_token(&format!("{}?status=completed", routes::HACKATHONS), &olga.token)
            .await;
        assert_eq!(completed.body["data"][0]["title"], "Past Jam");
        assert_eq!(completed.body["data"][0]["status"], "completed");

        let online = app
            .get_with_token(&format!("{}?mode=online", routes::HACKATHONS), &olga.token)
            .await;
        assert_eq!(online.body["pagination"]["total"], 1);
        assert_eq!(online.body["data"][0]["title"], "Later Jam");

        let searched = app
            .get_with_token(&format!("{}?search=SOON", routes::HACKATHONS), &olga.token)
            .await;
        assert_eq!(searched.body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn explicit_sort_order_wins() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        app.create_hackathon(&olga.token, "Alpha", 3).await;
        app.create_hackathon(&olga.token, "Beta", 3).await;

        let res = app
            .get_with_token(
                &format!("{}?sort_by=title&sort_order=asc", routes::HACKATHONS),
                &olga.token,
            )
            .await;

        assert_eq!(res.body["data"][0]["title"], "Alpha");
        assert_eq!(res.body["data"][1]["title"], "Beta");
    }

    #[tokio::test]
    async fn unknown_sort_or_status_is_rejected() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;

        let bad_sort = app
            .get_with_token(&format!("{}?sort_by=prize", routes::HACKATHONS), &olga.token)
            .await;
        let bad_status = app
            .get_with_token(&format!("{}?status=paused", routes::HACKATHONS), &olga.token)
            .await;

        assert_eq!(bad_sort.status, 400);
        assert_eq!(bad_status.status, 400);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn organizer_can_patch_and_clear_fields() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let res = app
            .post_with_token(routes::HACKATHONS, &hackathon_body("Rust Jam"), &olga.token)
            .await;
        let id = res.id();

        let res = app
            .patch_with_token(
                &routes::hackathon(id),
                &json!({"title": "Rust Jam 2", "prize": null}),
                &olga.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Rust Jam 2");
        assert_eq!(res.body["prize"], json!(null));
        assert_eq!(res.body["location"], "Berlin");
    }

    #[tokio::test]
    async fn other_organizers_cannot_patch() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let oscar = app.create_user_with_role("oscar", "organizer").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;

        let res = app
            .patch_with_token(&routes::hackathon(id), &json!({"title": "Mine"}), &oscar.token)
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn admins_can_patch_any_hackathon() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let admin = app.create_user_with_role("root", "admin").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;

        let res = app
            .patch_with_token(&routes::hackathon(id), &json!({"mode": "offline"}), &admin.token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["mode"], "offline");
    }

    #[tokio::test]
    async fn schedule_is_checked_against_stored_values() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;

        let res = app
            .patch_with_token(
                &routes::hackathon(id),
                &json!({"end_time": "2099-01-01T12:00:00Z"}),
                &olga.token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn team_size_cannot_drop_below_an_existing_team() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let carol = app.create_user("carol").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 4).await;
        for user in [&alice, &bob, &carol] {
            app.register_for_hackathon(id, &user.token).await;
        }
        app.create_team(id, &alice.token, "Crabs").await;
        for user in [&bob, &carol] {
            let req = app.send_join_request(id, &alice.token, user.id).await;
            let res = app
                .post_with_token(&routes::join_request_accept(req), &json!({}), &user.token)
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
        }

        let res = app
            .patch_with_token(&routes::hackathon(id), &json!({"max_team_size": 2}), &olga.token)
            .await;
        assert_eq!(res.status, 409);

        let res = app
            .patch_with_token(&routes::hackathon(id), &json!({"max_team_size": 3}), &olga.token)
            .await;
        assert_eq!(res.status, 200);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deleting_cascades_and_unlinks_projects() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;
        app.register_for_hackathon(id, &alice.token).await;
        let team_id = app.create_team(id, &alice.token, "Crabs").await;
        let project_id = app
            .create_project(&alice.token, json!({"title": "Matcher", "team_id": team_id}))
            .await;

        let res = app.delete_with_token(&routes::hackathon(id), &olga.token).await;
        assert_eq!(res.status, 204);

        let gone = app.get_with_token(&routes::hackathon(id), &olga.token).await;
        assert_eq!(gone.status, 404);
        let team = app.get_with_token(&routes::team(team_id), &alice.token).await;
        assert_eq!(team.status, 404);
        let project = app
            .get_with_token(&routes::project(project_id), &alice.token)
            .await;
        assert_eq!(project.status, 200);
        assert_eq!(project.body["hackathon_id"], json!(null));
        assert_eq!(project.body["team_id"], json!(null));
    }

    #[tokio::test]
    async fn participants_cannot_delete() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;

        let res = app.delete_with_token(&routes::hackathon(id), &alice.token).await;

        assert_eq!(res.status, 403);
    }
}

mod participation {
    use super::*;

    #[tokio::test]
    async fn register_then_duplicate_conflicts() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;

        let first = app
            .post_with_token(&routes::hackathon_register(id), &json!({}), &alice.token)
            .await;
        assert_eq!(first.status, 201, "{}", first.text);
        assert_eq!(first.body["ready"], false);
        assert_eq!(first.body["team_id"], json!(null));

        let second = app
            .post_with_token(&routes::hackathon_register(id), &json!({}), &alice.token)
            .await;
        assert_eq!(second.status, 409);

        let detail = app.get_with_token(&routes::hackathon(id), &alice.token).await;
        assert_eq!(detail.body["participant_count"], 1);
    }

    #[tokio::test]
    async fn registering_for_a_deleted_hackathon_is_404() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;
        app.delete_with_token(&routes::hackathon(id), &olga.token).await;

        let res = app
            .post_with_token(&routes::hackathon_register(id), &json!({}), &alice.token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn registration_closes_at_the_deadline() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let mut body = hackathon_body("Running");
        body["registration_deadline"] = json!("2000-01-01T00:00:00Z");
        body["start_time"] = json!("2000-01-02T00:00:00Z");
        let id = app
            .post_with_token(routes::HACKATHONS, &body, &olga.token)
            .await
            .id();

        let res = app
            .post_with_token(&routes::hackathon_register(id), &json!({}), &alice.token)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn ready_flag_and_participant_filters() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;
        app.register_for_hackathon(id, &alice.token).await;
        app.register_for_hackathon(id, &bob.token).await;
        app.patch_with_token(routes::MY_PROFILE, &json!({"skills": ["rust"]}), &bob.token)
            .await;

        let res = app
            .put_with_token(&routes::hackathon_ready(id), &json!({"ready": true}), &bob.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["ready"], true);

        let ready = app
            .get_with_token(
                &format!("{}?ready=true", routes::hackathon_participants(id)),
                &alice.token,
            )
            .await;
        assert_eq!(ready.status, 200);
        assert_eq!(ready.body.as_array().unwrap().len(), 1);
        assert_eq!(ready.body[0]["username"], "bob");
        assert_eq!(ready.body[0]["skills"], json!(["rust"]));

        let by_skill = app
            .get_with_token(
                &format!("{}?skill=rust", routes::hackathon_participants(id)),
                &alice.token,
            )
            .await;
        assert_eq!(by_skill.body.as_array().unwrap().len(), 1);

        app.create_team(id, &alice.token, "Crabs").await;
        let unassigned = app
            .get_with_token(
                &format!("{}?unassigned=true", routes::hackathon_participants(id)),
                &alice.token,
            )
            .await;
        assert_eq!(unassigned.body.as_array().unwrap().len(), 1);
        assert_eq!(unassigned.body[0]["username"], "bob");

        let detail = app.get_with_token(&routes::hackathon(id), &alice.token).await;
        assert_eq!(detail.body["ready_count"], 1);
        assert_eq!(detail.body["team_count"], 1);
    }

    #[tokio::test]
    async fn ready_requires_registration() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;

        let res = app
            .put_with_token(&routes::hackathon_ready(id), &json!({"ready": true}), &alice.token)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn full_team_members_cannot_be_ready() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 2).await;
        app.register_for_hackathon(id, &alice.token).await;
        app.register_for_hackathon(id, &bob.token).await;
        let req = app.send_join_request(id, &alice.token, bob.id).await;
        app.post_with_token(&routes::join_request_accept(req), &json!({}), &bob.token)
            .await;

        let res = app
            .put_with_token(&routes::hackathon_ready(id), &json!({"ready": true}), &alice.token)
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn unregister_requires_leaving_the_team_first() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;
        app.register_for_hackathon(id, &alice.token).await;
        app.register_for_hackathon(id, &bob.token).await;
        let team_id = app.create_team(id, &alice.token, "Crabs").await;
        app.send_join_request(id, &bob.token, alice.id).await;

        let blocked = app
            .delete_with_token(&routes::hackathon_register(id), &alice.token)
            .await;
        assert_eq!(blocked.status, 409);

        app.post_with_token(&routes::team_leave(team_id), &json!({}), &alice.token)
            .await;
        let res = app
            .delete_with_token(&routes::hackathon_register(id), &alice.token)
            .await;
        assert_eq!(res.status, 204);

        let again = app
            .delete_with_token(&routes::hackathon_register(id), &alice.token)
            .await;
        assert_eq!(again.status, 404);
    }

    #[tokio::test]
    async fn unregistering_drops_pending_requests() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;
        app.register_for_hackathon(id, &alice.token).await;
        app.register_for_hackathon(id, &bob.token).await;
        app.send_join_request(id, &alice.token, bob.id).await;

        let res = app
            .delete_with_token(&routes::hackathon_register(id), &alice.token)
            .await;
        assert_eq!(res.status, 204);

        let inbox = app.get_with_token(routes::JOIN_REQUESTS, &bob.token).await;
        assert_eq!(inbox.body.as_array().unwrap().len(), 0);
    }
}
