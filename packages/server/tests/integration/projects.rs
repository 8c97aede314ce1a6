use serde_json::json;

use crate::common::{TestApp, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn personal_project_with_defaults() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app
            .post_with_token(
                routes::PROJECTS,
                &json!({"title": "  Side quest ", "repo_url": "https://github.com/alice/quest"}),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["title"], "Side quest");
        assert_eq!(res.body["status"], "planning");
        assert_eq!(res.body["owner_id"], alice.id);
        assert_eq!(res.body["description"], "");
        assert_eq!(res.body["hackathon_id"], json!(null));
    }

    #[tokio::test]
    async fn non_https_urls_are_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app
            .post_with_token(
                routes::PROJECTS,
                &json!({"title": "Quest", "demo_url": "http://quest.dev"}),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn team_project_takes_the_team_hackathon() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;
        let other = app.create_hackathon(&olga.token, "Go Jam", 3).await;
        app.register_for_hackathon(id, &alice.token).await;
        let team_id = app.create_team(id, &alice.token, "Crabs").await;

        let res = app
            .post_with_token(
                routes::PROJECTS,
                &json!({"title": "Matcher", "team_id": team_id}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["hackathon_id"], id);
        assert_eq!(res.body["team_id"], team_id);

        let mismatch = app
            .post_with_token(
                routes::PROJECTS,
                &json!({"title": "Matcher", "team_id": team_id, "hackathon_id": other}),
                &alice.token,
            )
            .await;
        assert_eq!(mismatch.status, 400);
    }

    #[tokio::test]
    async fn only_members_attach_projects_to_a_team() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;
        app.register_for_hackathon(id, &alice.token).await;
        let team_id = app.create_team(id, &alice.token, "Crabs").await;

        let res = app
            .post_with_token(
                routes::PROJECTS,
                &json!({"title": "Intruder", "team_id": team_id}),
                &bob.token,
            )
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn hackathon_project_requires_registration() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;

        let res = app
            .post_with_token(
                routes::PROJECTS,
                &json!({"title": "Early", "hackathon_id": id}),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 403);
    }
}

mod access {
    use super::*;

    #[tokio::test]
    async fn outsiders_see_nothing() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let project_id = app
            .create_project(&alice.token, json!({"title": "Secret"}))
            .await;

        let get = app.get_with_token(&routes::project(project_id), &bob.token).await;
        assert_eq!(get.status, 404);

        let patch = app
            .patch_with_token(&routes::project(project_id), &json!({"title": "Mine"}), &bob.token)
            .await;
        assert_eq!(patch.status, 404);

        let list = app.get_with_token(routes::PROJECTS, &bob.token).await;
        assert_eq!(list.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn teammates_can_view_and_edit() {
        let app = TestApp::spawn().await;
        let olga = app.create_user_with_role("olga", "organizer").await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let id = app.create_hackathon(&olga.token, "Rust Jam", 3).await;
        app.register_for_hackathon(id, &alice.token).await;
        app.register_for_hackathon(id, &bob.token).await;
        let team_id = app.create_team(id, &alice.token, "Crabs").await;
        let req = app.send_join_request(id, &alice.token, bob.id).await;
        app.post_with_token(&routes::join_request_accept(req), &json!({}), &bob.token)
            .await;
        let project_id = app
            .create_project(&alice.token, json!({"title": "Matcher", "team_id": team_id}))
            .await;

        let list = app.get_with_token(routes::PROJECTS, &bob.token).await;
        assert_eq!(list.body["pagination"]["total"], 1);

        let res = app
            .patch_with_token(
                &routes::project(project_id),
                &json!({"status": "in_progress", "repo_url": "https://github.com/crabs/matcher"}),
                &bob.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "in_progress");

        let cleared = app
            .patch_with_token(&routes::project(project_id), &json!({"repo_url": null}), &bob.token)
            .await;
        assert_eq!(cleared.body["repo_url"], json!(null));

        let delete = app
            .delete_with_token(&routes::project(project_id), &bob.token)
            .await;
        assert_eq!(delete.status, 403);
    }

    #[tokio::test]
    async fn project_managers_see_everything() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let admin = app.create_user_with_role("root", "admin").await;
        let project_id = app
            .create_project(&alice.token, json!({"title": "Secret"}))
            .await;

        let get = app
            .get_with_token(&routes::project(project_id), &admin.token)
            .await;
        assert_eq!(get.status, 200);

        let delete = app
            .delete_with_token(&routes::project(project_id), &admin.token)
            .await;
        assert_eq!(delete.status, 204);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn newest_first_with_status_filter() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        app.create_project(&alice.token, json!({"title": "First"})).await;
        app.create_project(&alice.token, json!({"title": "Second", "status": "completed"}))
            .await;

        let all = app.get_with_token(routes::PROJECTS, &alice.token).await;
        assert_eq!(all.status, 200);
        assert_eq!(all.body["data"][0]["title"], "Second");
        assert_eq!(all.body["data"][1]["title"], "First");

        let done = app
            .get_with_token(&format!("{}?status=completed", routes::PROJECTS), &alice.token)
            .await;
        assert_eq!(done.body["pagination"]["total"], 1);

        let bad = app
            .get_with_token(&format!("{}?status=shipped", routes::PROJECTS), &alice.token)
            .await;
        assert_eq!(bad.status, 400);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn owner_deletes_project_and_its_tasks() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let project_id = app
            .create_project(&alice.token, json!({"title": "Quest"}))
            .await;
        app.post_with_token(&routes::tasks(project_id), &json!({"title": "Plan"}), &alice.token)
            .await;

        let res = app
            .delete_with_token(&routes::project(project_id), &alice.token)
            .await;
        assert_eq!(res.status, 204);

        let gone = app
            .get_with_token(&routes::project(project_id), &alice.token)
            .await;
        assert_eq!(gone.status, 404);
    }
}
