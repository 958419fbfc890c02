mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use forum_db::ListOrder;
use forum_db::models::{MessageFilter, ThemeFilter};

use common::{TestApp, ids};

#[tokio::test]
async fn only_staff_can_create_chapters() -> Result<()> {
    let app = TestApp::seeded()?;
    let before = app.db().count_chapters()?;

    let res = app.post(Some(app.fixture.admin), "/chapters/create/", json!({ "name": "chapter 3" })).await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["name"], "chapter 3");
    assert_eq!(res.body["categories"], json!([]));
    assert_eq!(app.db().count_chapters()?, before + 1);

    let res = app.post(Some(app.fixture.user1), "/chapters/create/", json!({ "name": "chapter 3" })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(res.body["detail"].is_string());
    assert_eq!(app.db().count_chapters()?, before + 1);

    let res = app.post(None, "/chapters/create/", json!({ "name": "chapter 3" })).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn chapter_name_is_required() -> Result<()> {
    let app = TestApp::seeded()?;

    let res = app.post(Some(app.fixture.admin), "/chapters/create/", json!({ "name": "   " })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["name"].is_array());

    let long = "x".repeat(501);
    let res = app.post(Some(app.fixture.admin), "/chapters/create/", json!({ "name": long })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn chapter_projections() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;

    let res = app.get("/chapters/").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ids(&res.body), vec![f.chapter1, f.chapter2]);
    assert_eq!(res.body[0]["categories"], json!([f.categories[0], f.categories[1]]));

    let res = app.get(&format!("/chapters/{}/", f.chapter1)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ids(&res.body["categories"]), vec![f.categories[0], f.categories[1]]);
    assert_eq!(res.body["categories"][0]["chapter"]["id"], f.chapter1);

    let res = app.get("/chapters/9999/").await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["detail"], "Not found.");

    Ok(())
}

#[tokio::test]
async fn deleting_a_chapter_removes_its_subtree() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;

    let res = app.delete(Some(f.user1), &format!("/chapters/update/{}/", f.chapter1)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.delete(Some(f.admin), &format!("/chapters/update/{}/", f.chapter1)).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    assert!(app.db().get_chapter(f.chapter1)?.is_none());
    for id in &f.categories[..2] {
        assert!(app.db().get_category(*id)?.is_none());
    }
    for id in f.themes {
        assert!(app.db().get_theme(id)?.is_none());
    }
    for id in f.messages {
        assert!(app.db().get_message(id)?.is_none());
    }
    assert!(app.db().get_category(f.categories[2])?.is_some());

    Ok(())
}

#[tokio::test]
async fn categories_filter_by_chapter_and_check_references() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;

    let res = app.get(&format!("/categories/?chapter={}", f.chapter2)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ids(&res.body), vec![f.categories[2]]);
    assert_eq!(res.body[0]["chapter"]["id"], f.chapter2);

    let res = app.get(&format!("/categories/{}/", f.categories[0])).await?;
    assert_eq!(ids(&res.body["themes"]), vec![f.themes[0], f.themes[1]]);

    let res = app
        .post(Some(f.admin), "/categories/create/", json!({ "chapter": 9999, "name": "Category 4" }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["chapter"].is_array());

    let res = app
        .post(Some(f.admin), "/categories/create/", json!({ "chapter": f.chapter2, "name": "Category 4" }))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["chapter"], f.chapter2);

    let res = app
        .patch(
            Some(f.admin),
            &format!("/categories/update/{}/", f.categories[2]),
            json!({ "chapter": f.chapter1 }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["chapter"], f.chapter1);

    Ok(())
}

#[tokio::test]
async fn authenticated_users_create_themes_they_own() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;

    let payload = json!({ "category": f.categories[1], "name": "Theme 4", "user": f.admin });

    let res = app.post(None, "/themes/create/", payload.clone()).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.post(Some(f.user2), "/themes/create/", payload).await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["user"], f.user2);
    assert_eq!(res.body["status"], true);
    assert_eq!(res.body["category"], f.categories[1]);

    let res = app
        .post(Some(f.user2), "/themes/create/", json!({ "category": 9999, "name": "Theme 5" }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["category"].is_array());

    Ok(())
}

#[tokio::test]
async fn closed_theme_rejects_new_messages() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;
    let closed = f.themes[1];
    let before = app.db().count_messages(&MessageFilter::default())?;

    let res = app
        .post(Some(f.user2), "/messages/create/", json!({ "theme": closed, "content": "too late" }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, json!({ "theme": ["Cannot create a message in a closed theme."] }));
    assert_eq!(app.db().count_messages(&MessageFilter::default())?, before);

    // Staff are not exempt
    let res = app
        .post(Some(f.admin), "/messages/create/", json!({ "theme": closed, "content": "too late" }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post(Some(f.user2), "/messages/create/", json!({ "theme": f.themes[0], "content": "just in time" }))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["user"], f.user2);
    assert_eq!(app.db().count_messages(&MessageFilter::default())?, before + 1);

    Ok(())
}

#[tokio::test]
async fn existing_messages_in_a_closed_theme_stay_editable() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;

    let res = app
        .patch(Some(f.user1), &format!("/messages/update/{}/", f.messages[2]), json!({ "content": "edited" }))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["content"], "edited");

    Ok(())
}

#[tokio::test]
async fn non_owners_cannot_touch_themes_or_messages() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;
    let theme = f.themes[0];
    let message = f.messages[0];

    let res = app
        .patch(Some(f.user2), &format!("/themes/update/{}/", theme), json!({ "name": "hijacked" }))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.db().get_theme(theme)?.map(|t| t.name), Some("Theme 1".to_string()));

    let res = app
        .patch(Some(f.user2), &format!("/messages/update/{}/", message), json!({ "content": "hijacked" }))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.db().get_message(message)?.map(|m| m.content), Some("content 1".to_string()));

    // Deletes are staff-only, owners included
    let res = app.delete(Some(f.user1), &format!("/themes/delete/{}/", theme)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.delete(Some(f.user1), &format!("/messages/delete/{}/", message)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(app.db().get_message(message)?.is_some());

    let res = app.patch(None, &format!("/themes/update/{}/", theme), json!({ "name": "anon" })).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn owner_and_staff_can_update() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;
    let theme = f.themes[0];

    let res = app
        .patch(Some(f.user1), &format!("/themes/update/{}/", theme), json!({ "status": false }))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["status"], false);
    assert_eq!(res.body["name"], "Theme 1");

    let res = app
        .patch(Some(f.admin), &format!("/themes/update/{}/", theme), json!({ "name": "Renamed", "status": true }))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["name"], "Renamed");
    assert_eq!(res.body["user"], f.user1);

    let before = app.db().get_message(f.messages[1])?.map(|m| m.updated_at);
    let res = app
        .patch(Some(f.admin), &format!("/messages/update/{}/", f.messages[1]), json!({ "content": "moderated" }))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["content"], "moderated");
    assert_eq!(res.body["user"], f.user2);
    assert_ne!(app.db().get_message(f.messages[1])?.map(|m| m.updated_at), before);

    let res = app
        .patch(Some(f.admin), "/themes/update/9999/", json!({ "name": "ghost" }))
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn staff_delete_themes_with_their_messages() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;

    let res = app.delete(Some(f.admin), &format!("/themes/delete/{}/", f.themes[0])).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(app.db().get_message(f.messages[0])?.is_none());
    assert!(app.db().get_message(f.messages[1])?.is_none());
    assert!(app.db().get_message(f.messages[2])?.is_some());

    let res = app.delete(Some(f.admin), &format!("/themes/delete/{}/", f.themes[0])).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn theme_list_is_oldest_first_and_filterable() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;

    let res = app.get("/themes/").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["count"], 3);
    assert_eq!(ids(&res.body["results"]), f.themes.to_vec());
    assert_eq!(res.body["results"][0]["messages"], json!([f.messages[0], f.messages[1]]));
    assert_eq!(res.body["results"][0]["category"]["id"], f.categories[0]);

    let res = app.get(&format!("/themes/?category={}", f.categories[0])).await?;
    assert_eq!(ids(&res.body["results"]), vec![f.themes[0], f.themes[1]]);

    let res = app.get(&format!("/themes/?user={}&status=true", f.user1)).await?;
    assert_eq!(ids(&res.body["results"]), vec![f.themes[0]]);

    let res = app.get("/themes/?ordering=-created_at").await?;
    assert_eq!(ids(&res.body["results"]), vec![f.themes[2], f.themes[1], f.themes[0]]);

    let res = app.get("/themes/?category=abc").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn theme_detail_embeds_messages() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;
    app.db().insert_like(f.user2, f.messages[0], true)?;

    let res = app.get(&format!("/themes/{}/", f.themes[0])).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["messages_count"], 2);
    assert_eq!(ids(&res.body["messages"]), vec![f.messages[0], f.messages[1]]);
    assert_eq!(res.body["messages"][0]["likes_count"], 1);

    Ok(())
}

#[tokio::test]
async fn message_list_paginates_in_creation_order() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;
    let theme = f.themes[2];
    for n in 0..20 {
        app.db().insert_message(f.user2, theme, &format!("bulk {}", n))?;
    }
    let expected: Vec<i64> = app
        .db()
        .list_messages(
            &MessageFilter { theme_id: Some(theme), user_id: None },
            ListOrder::CreatedAsc,
            100,
            0,
        )?
        .into_iter()
        .map(|m| m.id)
        .collect();

    let res = app.get(&format!("/messages/?theme={}", theme)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["count"], 20);
    assert_eq!(res.body["next"], 2);
    assert!(res.body["previous"].is_null());
    assert_eq!(ids(&res.body["results"]), expected[..15].to_vec());

    let res = app.get(&format!("/messages/?theme={}&page=the_end", theme)).await?;
    assert_eq!(res.body["previous"], 1);
    assert!(res.body["next"].is_null());
    assert_eq!(ids(&res.body["results"]), expected[15..].to_vec());

    let res = app.get(&format!("/messages/?theme={}&page_size=5&page=4", theme)).await?;
    assert_eq!(ids(&res.body["results"]), expected[15..].to_vec());

    let res = app.get(&format!("/messages/?theme={}&page=3", theme)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["detail"], "Invalid page.");

    let res = app.get(&format!("/messages/?user={}", f.user1)).await?;
    assert_eq!(ids(&res.body["results"]), vec![f.messages[0], f.messages[2]]);

    Ok(())
}

#[tokio::test]
async fn likes_count_only_liked_relations() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;
    let message = f.messages[0];

    let res = app.post(None, "/likes/create/", json!({ "message": message, "like": true })).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.post(Some(f.user2), "/likes/create/", json!({ "message": message, "like": true })).await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"], f.user2);
    let like = res.body["id"].as_i64().unwrap_or_default();

    let res = app.post(Some(f.admin), "/likes/create/", json!({ "message": message })).await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["like"], false);

    let res = app.get(&format!("/messages/{}/", message)).await?;
    assert_eq!(res.body["likes_count"], 1);

    let res = app.patch(Some(f.user1), &format!("/likes/update/{}/", like), json!({ "like": false })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.patch(Some(f.user2), &format!("/likes/update/{}/", like), json!({ "like": false })).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["like"], false);

    let res = app.get(&format!("/messages/{}/", message)).await?;
    assert_eq!(res.body["likes_count"], 0);

    let res = app.get(&format!("/messages/{}/likes/", message)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body.as_array().map(Vec::len), Some(2));

    let res = app.post(Some(f.user2), "/likes/create/", json!({ "message": 9999, "like": true })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["message"].is_array());

    Ok(())
}

#[tokio::test]
async fn theme_counts_match_filters() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;

    let open = ThemeFilter { status: Some(true), ..Default::default() };
    let res = app.get("/themes/?status=true").await?;
    assert_eq!(res.body["count"].as_u64(), Some(app.db().count_themes(&open)? as u64));
    assert_eq!(ids(&res.body["results"]), vec![f.themes[0], f.themes[2]]);

    Ok(())
}

#[tokio::test]
async fn wrongly_typed_fields_are_reported_per_field() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;
    let before = app.db().count_messages(&MessageFilter::default())?;

    let res = app.post(Some(f.user1), "/messages/create/", json!({ "theme": "abc", "content": "x" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, json!({ "theme": ["Incorrect type. Expected pk value, received str."] }));
    assert_eq!(app.db().count_messages(&MessageFilter::default())?, before);

    let res = app
        .post(Some(f.admin), "/categories/create/", json!({ "chapter": [1], "name": "Category 4" }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, json!({ "chapter": ["Incorrect type. Expected pk value, received list."] }));

    let res = app
        .post(Some(f.user1), "/themes/create/", json!({ "category": f.categories[0], "name": {}, "status": "maybe" }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["name"], json!(["Not a valid string."]));
    assert_eq!(res.body["status"], json!(["Must be a valid boolean."]));

    let res = app
        .patch(Some(f.user1), &format!("/themes/update/{}/", f.themes[0]), json!({ "category": true }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, json!({ "category": ["Incorrect type. Expected pk value, received bool."] }));
    assert_eq!(app.db().get_theme(f.themes[0])?.map(|t| t.category_id), Some(f.categories[0]));

    // Numeric strings still resolve
    let res = app
        .post(Some(f.user1), "/messages/create/", json!({ "theme": f.themes[0].to_string(), "content": "x" }))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["theme"], f.themes[0]);

    Ok(())
}

#[tokio::test]
async fn message_to_missing_theme_is_a_field_error() -> Result<()> {
    let app = TestApp::seeded()?;
    let before = app.db().count_messages(&MessageFilter::default())?;

    let res = app
        .post(Some(app.fixture.user1), "/messages/create/", json!({ "theme": 9999, "content": "lost" }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, json!({ "theme": ["Invalid pk \"9999\" - object does not exist."] }));
    assert_eq!(app.db().count_messages(&MessageFilter::default())?, before);

    Ok(())
}

#[tokio::test]
async fn staff_update_chapters() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;
    let uri = format!("/chapters/update/{}/", f.chapter1);

    let res = app.patch(Some(f.user1), &uri, json!({ "name": "hijacked" })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.db().get_chapter(f.chapter1)?.map(|c| c.name), Some("chapter 1".to_string()));

    let res = app.patch(Some(f.admin), &uri, json!({ "description": "renamed below" })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["name"], "chapter 1");
    assert_eq!(res.body["description"], "renamed below");
    assert_eq!(res.body["categories"], json!([f.categories[0], f.categories[1]]));

    let stored = app.db().get_chapter(f.chapter1)?;
    assert_eq!(stored.map(|c| c.description), Some("renamed below".to_string()));

    let res = app.patch(Some(f.admin), &uri, json!({ "name": "" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["name"].is_array());

    let res = app.patch(Some(f.admin), "/chapters/update/9999/", json!({ "name": "ghost" })).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn staff_delete_categories_with_their_themes() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;
    let uri = format!("/categories/update/{}/", f.categories[0]);

    let res = app.delete(Some(f.user1), &uri).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(app.db().get_category(f.categories[0])?.is_some());

    let res = app.delete(Some(f.admin), &uri).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(app.db().get_category(f.categories[0])?.is_none());
    assert!(app.db().get_theme(f.themes[0])?.is_none());
    assert!(app.db().get_theme(f.themes[1])?.is_none());
    assert!(app.db().get_message(f.messages[2])?.is_none());
    assert!(app.db().get_theme(f.themes[2])?.is_some());
    assert!(app.db().get_chapter(f.chapter1)?.is_some());

    let res = app.delete(Some(f.admin), &uri).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn staff_delete_messages() -> Result<()> {
    let app = TestApp::seeded()?;
    let f = &app.fixture;
    let message = f.messages[1];
    app.db().insert_like(f.user1, message, true)?;

    let res = app.delete(None, &format!("/messages/delete/{}/", message)).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.delete(Some(f.admin), &format!("/messages/delete/{}/", message)).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(app.db().get_message(message)?.is_none());
    assert!(app.db().likes_for_message(message)?.is_empty());
    assert!(app.db().get_message(f.messages[0])?.is_some());

    let res = app.get(&format!("/messages/{}/", message)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.delete(Some(f.admin), &format!("/messages/delete/{}/", message)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    Ok(())
}
