#[cfg(test)]
mod integration_tests {
    use crate::handlers::auth::{ALL_FIELDS_REQUIRED, BAD_CREDENTIALS, EMAIL_IN_USE};
    use crate::handlers::favourites::ALREADY_FAVOURITE;
    use crate::handlers::reader::COMMENT_FIELDS_REQUIRED;
    use crate::session::AUTHOR_ONLY;
    use crate::test_utils::test_utils::{
        create_listing, create_user, init_test_tracing, login, setup_test_app, setup_test_server,
        signed_in_user, TEST_PASSWORD,
    };
    use axum::http::{
        header::{COOKIE, LOCATION, SET_COOKIE},
        StatusCode,
    };
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use model::entities::{product::OfferStatus, user};
    use rust_decimal::Decimal;
    use sea_orm::EntityTrait;
    use serde_json::{json, Value};
    use std::str::FromStr;

    const ALICE: &str = "alice@mymail.sim.edu.sg";
    const BOB: &str = "bob@mymail.sim.edu.sg";
    const CAROL: &str = "carol@mymail.sim.edu.sg";

    fn png_part(name: &str) -> Part {
        Part::bytes(vec![0x89, b'P', b'N', b'G', 1, 2, 3])
            .file_name(name.to_string())
            .mime_type("image/png")
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let _guard = init_test_tracing();
        let (server, state) = setup_test_server().await;

        let page = server.get("/register").await;
        page.assert_status(StatusCode::OK);
        let page: Value = page.json();
        assert!(!page["courses"].as_array().unwrap().is_empty());
        assert!(page["error"].is_null());

        let response = server
            .post("/register")
            .form(&[
                ("name", "Dana"),
                ("password", "s3cret"),
                ("email", " Dana@MyMail.sim.edu.sg "),
                ("course", "Computer Science"),
                ("description", "Second year"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(LOCATION), "/login");

        let stored = store::users::find_by_email(state.store.conn(), "dana@mymail.sim.edu.sg")
            .await
            .unwrap()
            .expect("user stored with normalized email");
        assert_ne!(stored.password_hash, "s3cret");
        assert_eq!(stored.rating, 0);

        let login = server
            .post("/login")
            .form(&[("email", "dana@mymail.sim.edu.sg"), ("password", "s3cret")])
            .await;
        login.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(login.header(LOCATION), "/");
        let cookie = login.header(SET_COOKIE);
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("campusmart.sid="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_register_rejections_rerender_form() {
        let (server, state) = setup_test_server().await;
        create_user(&state, ALICE, "Alice").await;

        let wrong_domain = server
            .post("/register")
            .form(&[
                ("name", "Eve"),
                ("password", "pw"),
                ("email", "eve@gmail.com"),
                ("course", "Business"),
                ("description", "Hi"),
            ])
            .await;
        wrong_domain.assert_status(StatusCode::OK);
        let body: Value = wrong_domain.json();
        assert_eq!(
            body["error"],
            "Please use a SIM email address with @mymail.sim.edu.sg"
        );
        assert!(!body["courses"].as_array().unwrap().is_empty());

        let missing = server
            .post("/register")
            .form(&[("name", "Eve"), ("email", "eve@mymail.sim.edu.sg")])
            .await;
        let body: Value = missing.json();
        assert_eq!(body["error"], ALL_FIELDS_REQUIRED);

        let taken = server
            .post("/register")
            .form(&[
                ("name", "Alice Again"),
                ("password", "pw"),
                ("email", ALICE),
                ("course", "Business"),
                ("description", "Hi"),
            ])
            .await;
        let body: Value = taken.json();
        assert_eq!(body["error"], EMAIL_IN_USE);

        // Rejected registrations leave the store untouched
        let users = user::Entity::find().all(state.store.conn()).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, ALICE);
        assert_eq!(users[0].name, "Alice");

        assert!(
            store::users::find_by_email(state.store.conn(), "eve@gmail.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_login_failures_share_one_message() {
        let (server, state) = setup_test_server().await;
        create_user(&state, ALICE, "Alice").await;

        let wrong_password = server
            .post("/login")
            .form(&[("email", ALICE), ("password", "nope")])
            .await;
        wrong_password.assert_status(StatusCode::OK);
        let body: Value = wrong_password.json();
        assert_eq!(body["error"], BAD_CREDENTIALS);

        let unknown = server
            .post("/login")
            .form(&[("email", "ghost@mymail.sim.edu.sg"), ("password", TEST_PASSWORD)])
            .await;
        let body: Value = unknown.json();
        assert_eq!(body["error"], BAD_CREDENTIALS);
    }

    #[tokio::test]
    async fn test_protected_routes_redirect_to_login() {
        let (server, _state) = setup_test_server().await;

        for path in ["/", "/profile", "/product/new", "/category/books", "/author"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(response.header(LOCATION), "/login", "path {}", path);
        }

        let offer = server.post("/product/make-offer").json(&json!({"productId": 1})).await;
        offer.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let (server, state) = setup_test_server().await;
        let (_alice, cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;

        server.get("/").add_header(COOKIE, cookie.clone()).await.assert_status(StatusCode::OK);

        let logout = server.get("/logout").add_header(COOKIE, cookie.clone()).await;
        logout.assert_status(StatusCode::SEE_OTHER);
        assert!(logout.header(SET_COOKIE).to_str().unwrap().contains("Max-Age=0"));

        let after = server.get("/").add_header(COOKIE, cookie).await;
        after.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(after.header(LOCATION), "/login");
    }

    #[tokio::test]
    async fn test_home_lists_open_listings_with_filters() {
        let (server, state) = setup_test_server().await;
        let (alice, cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;
        let bob = create_user(&state, BOB, "Bob").await;

        let lamp = create_listing(&state, alice.id, "Desk Lamp", "Furniture", "Sell").await;
        let guitar = create_listing(&state, alice.id, "Guitar", "Music", "Sell, Trade").await;
        let sold = create_listing(&state, alice.id, "Lamp Shade", "Furniture", "Sell").await;
        store::products::make_offer(state.store.conn(), sold.id, bob.id).await.unwrap();

        let all: Value = server.get("/").add_header(COOKIE, cookie.clone()).await.json();
        let ids: Vec<i64> = all["products"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![lamp.id as i64, guitar.id as i64]);
        assert_eq!(all["user"]["email"], ALICE);
        assert!(all["user"].get("password_hash").is_none());
        let lamp_images = &all["images"][lamp.id.to_string()];
        assert_eq!(lamp_images.as_array().unwrap().len(), 1);
        assert!(lamp_images[0]["src"].as_str().unwrap().starts_with("data:image/png;base64,"));

        let by_name: Value = server
            .get("/")
            .add_query_param("name", "lamp")
            .add_header(COOKIE, cookie.clone())
            .await
            .json();
        assert_eq!(by_name["products"].as_array().unwrap().len(), 1);
        assert_eq!(by_name["products"][0]["name"], "Desk Lamp");
        assert_eq!(by_name["name"], "lamp");

        let by_type: Value = server
            .get("/")
            .add_query_param("transaction_type", "Sell, Trade")
            .add_header(COOKIE, cookie)
            .await
            .json();
        assert_eq!(by_type["products"].as_array().unwrap().len(), 1);
        assert_eq!(by_type["products"][0]["name"], "Guitar");
    }

    #[tokio::test]
    async fn test_create_product_with_images() {
        let (server, state) = setup_test_server().await;
        let (alice, cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;

        let form = MultipartForm::new()
            .add_text("name", "Calculator")
            .add_text("description", "Graphing calculator")
            .add_text("price", "")
            .add_text("category", "Electronics")
            .add_text("transaction_type", "Sell")
            .add_text("transaction_type", "Trade")
            .add_text("condition", "Like new")
            .add_part("images", png_part("front.png"))
            .add_part("images", png_part("back.png"));

        let response = server
            .post("/product/new")
            .add_header(COOKIE, cookie.clone())
            .multipart(form)
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let listings = store::products::listings_for_user(state.store.conn(), alice.id).await.unwrap();
        assert_eq!(listings.len(), 1);
        let created = &listings[0];
        assert_eq!(response.header(LOCATION), format!("/product/{}", created.id).as_str());
        assert_eq!(created.transaction_type, "Sell, Trade");
        assert_eq!(created.price, Decimal::ZERO);
        assert_eq!(created.offer_status, OfferStatus::NotMade);
        assert!(created.availability);

        let images = store::images::for_product(state.store.conn(), created.id).await.unwrap();
        assert_eq!(images.len(), 2);
        assert!(images.iter().all(|i| i.image_type == "image/png"));

        let page: Value = server
            .get(&format!("/product/{}", created.id))
            .add_header(COOKIE, cookie)
            .await
            .json();
        assert_eq!(page["images"].as_array().unwrap().len(), 2);
        assert_eq!(page["owner"]["id"], alice.id);
        assert_eq!(page["is_favourite"], false);
        assert_eq!(page["session_user_id"], alice.id);

        let leftovers = std::fs::read_dir(&state.settings.uploads.dir).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_create_product_rejects_too_many_images() {
        let (server, state) = setup_test_server().await;
        let (alice, cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;

        let mut form = MultipartForm::new().add_text("name", "Posters");
        for i in 0..5 {
            form = form.add_part("images", png_part(&format!("{}.png", i)));
        }
        let response = server
            .post("/product/new")
            .add_header(COOKIE, cookie)
            .multipart(form)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(
            store::products::listings_for_user(state.store.conn(), alice.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_missing_product_is_404() {
        let (server, state) = setup_test_server().await;
        let (_alice, cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;

        let response = server.get("/product/9999").add_header(COOKIE, cookie).await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "Product not found");
    }

    #[tokio::test]
    async fn test_edit_product_swaps_images() {
        let (server, state) = setup_test_server().await;
        let (alice, alice_cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;
        let (_bob, bob_cookie) = signed_in_user(&server, &state, BOB, "Bob").await;
        let listing = create_listing(&state, alice.id, "Chair", "Furniture", "Sell").await;
        let old_image = store::images::for_product(state.store.conn(), listing.id).await.unwrap()[0].id;

        let denied = server
            .get(&format!("/product/edit/{}", listing.id))
            .add_header(COOKIE, bob_cookie)
            .await;
        denied.assert_status(StatusCode::FORBIDDEN);

        let page: Value = server
            .get(&format!("/product/edit/{}", listing.id))
            .add_header(COOKIE, alice_cookie.clone())
            .await
            .json();
        assert_eq!(page["images"][0]["id"], old_image);

        let form = MultipartForm::new()
            .add_text("name", "Office Chair")
            .add_text("description", "Swivel")
            .add_text("price", "25.50")
            .add_text("category", "Furniture")
            .add_text("transaction_type", "Sell")
            .add_text("condition", "Used")
            .add_text("removeImages", old_image.to_string())
            .add_part("images", png_part("new.png"));
        let response = server
            .post(&format!("/product/edit/{}", listing.id))
            .add_header(COOKIE, alice_cookie)
            .multipart(form)
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let updated = store::products::find_by_id(state.store.conn(), listing.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Office Chair");
        assert_eq!(updated.price, Decimal::from_str("25.50").unwrap());
        let images = store::images::for_product(state.store.conn(), listing.id).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_ne!(images[0].id, old_image);
    }

    #[tokio::test]
    async fn test_delete_product_removes_images() {
        let (server, state) = setup_test_server().await;
        let (alice, alice_cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;
        let (_bob, bob_cookie) = signed_in_user(&server, &state, BOB, "Bob").await;
        let listing = create_listing(&state, alice.id, "Kettle", "Kitchen", "Free").await;

        server
            .post(&format!("/product/delete/{}", listing.id))
            .add_header(COOKIE, bob_cookie)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server
            .post(&format!("/product/delete/{}", listing.id))
            .add_header(COOKIE, alice_cookie)
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(LOCATION), "/");

        assert!(store::products::find_by_id(state.store.conn(), listing.id).await.unwrap().is_none());
        assert!(store::images::for_product(state.store.conn(), listing.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offer_lifecycle() {
        let (server, state) = setup_test_server().await;
        let (alice, alice_cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;
        let (bob, bob_cookie) = signed_in_user(&server, &state, BOB, "Bob").await;
        let (_carol, carol_cookie) = signed_in_user(&server, &state, CAROL, "Carol").await;
        let listing = create_listing(&state, alice.id, "Bike", "Sports", "Sell").await;
        let body = json!({"productId": listing.id});

        // Seller cannot buy their own listing
        server
            .post("/product/make-offer")
            .add_header(COOKIE, alice_cookie.clone())
            .json(&body)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // Completing before the offer is in progress is a conflict
        let early = server
            .post("/product/complete-offer")
            .add_header(COOKIE, alice_cookie.clone())
            .json(&body)
            .await;
        early.assert_status(StatusCode::CONFLICT);

        let made = server
            .post("/product/make-offer")
            .add_header(COOKIE, bob_cookie.clone())
            .json(&body)
            .await;
        made.assert_status(StatusCode::OK);
        made.assert_json(&json!({"success": true}));

        let second = server
            .post("/product/make-offer")
            .add_header(COOKIE, carol_cookie.clone())
            .json(&body)
            .await;
        second.assert_status(StatusCode::CONFLICT);
        let second: Value = second.json();
        assert_eq!(second["success"], false);

        server
            .post("/product/offer-in-progress")
            .add_header(COOKIE, bob_cookie.clone())
            .json(&body)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .post("/product/offer-in-progress")
            .add_header(COOKIE, alice_cookie.clone())
            .json(&body)
            .await
            .assert_status(StatusCode::OK);

        server
            .post("/product/complete-offer")
            .add_header(COOKIE, carol_cookie)
            .json(&body)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .post("/product/complete-offer")
            .add_header(COOKIE, bob_cookie.clone())
            .json(&body)
            .await
            .assert_status(StatusCode::OK);

        let done = store::products::find_by_id(state.store.conn(), listing.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.offer_status, OfferStatus::Completed);
        assert_eq!(done.offer_made_by, Some(bob.id));
        assert!(!done.availability);

        // Completed listings leave the home page but show up as transactions
        let home: Value = server.get("/").add_header(COOKIE, bob_cookie.clone()).await.json();
        assert!(home["products"].as_array().unwrap().is_empty());
        let profile: Value = server.get("/profile").add_header(COOKIE, bob_cookie).await.json();
        assert_eq!(profile["transactions"][0]["id"], listing.id);
        assert_eq!(profile["transactions"][0]["offer_status"], "completed");
    }

    #[tokio::test]
    async fn test_offer_requires_product_id() {
        let (server, state) = setup_test_server().await;
        let (_alice, cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;

        let response = server
            .post("/product/make-offer")
            .add_header(COOKIE, cookie.clone())
            .json(&json!({}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let missing = server
            .post("/product/make-offer")
            .add_header(COOKIE, cookie)
            .json(&json!({"productId": 4242}))
            .await;
        missing.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_favourites_add_and_remove() {
        let (server, state) = setup_test_server().await;
        let (alice, _) = signed_in_user(&server, &state, ALICE, "Alice").await;
        let (bob, bob_cookie) = signed_in_user(&server, &state, BOB, "Bob").await;
        let listing = create_listing(&state, alice.id, "Desk", "Furniture", "Sell").await;
        let body = json!({"productId": listing.id});

        server
            .post("/product/favourites/add")
            .add_header(COOKIE, bob_cookie.clone())
            .json(&body)
            .await
            .assert_status(StatusCode::OK);

        let duplicate = server
            .post("/product/favourites/add")
            .add_header(COOKIE, bob_cookie.clone())
            .json(&body)
            .await;
        duplicate.assert_status(StatusCode::BAD_REQUEST);
        duplicate.assert_json(&json!({"success": false, "message": ALREADY_FAVOURITE}));

        let page: Value = server
            .get(&format!("/product/{}", listing.id))
            .add_header(COOKIE, bob_cookie.clone())
            .await
            .json();
        assert_eq!(page["is_favourite"], true);

        let profile: Value = server.get("/profile").add_header(COOKIE, bob_cookie.clone()).await.json();
        assert_eq!(profile["favourites"][0]["name"], "Desk");
        assert_eq!(profile["favourite_images"][listing.id.to_string()].as_array().unwrap().len(), 1);

        for _ in 0..2 {
            server
                .post("/product/favourites/remove")
                .add_header(COOKIE, bob_cookie.clone())
                .json(&body)
                .await
                .assert_status(StatusCode::OK);
        }
        assert!(
            store::favourites::find(state.store.conn(), bob.id, listing.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_reviews_set_floor_mean_rating() {
        let (server, state) = setup_test_server().await;
        let (alice, _) = signed_in_user(&server, &state, ALICE, "Alice").await;
        let (_bob, bob_cookie) = signed_in_user(&server, &state, BOB, "Bob").await;
        let listing = create_listing(&state, alice.id, "Textbook", "Books", "Sell").await;
        let path = format!("/product/{}", listing.id);

        for (stars, text) in [("5", "Great"), ("3", "Okay"), ("4", "Good")] {
            let response = server
                .post(&path)
                .add_header(COOKIE, bob_cookie.clone())
                .form(&[("review", text), ("rating", stars)])
                .await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(response.header(LOCATION), "/");
        }

        let seller = store::users::find_by_id(state.store.conn(), alice.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seller.rating, 4);

        let out_of_range = server
            .post(&path)
            .add_header(COOKIE, bob_cookie.clone())
            .form(&[("review", "Wow"), ("rating", "6")])
            .await;
        out_of_range.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = out_of_range.json();
        assert_eq!(body["message"], "Rating must be between 1 and 5 stars.");

        let missing = server
            .post("/product/9999")
            .add_header(COOKIE, bob_cookie.clone())
            .form(&[("review", "Hmm"), ("rating", "2")])
            .await;
        missing.assert_status(StatusCode::NOT_FOUND);

        let profile: Value = server
            .get(&format!("/profile/{}", alice.id))
            .add_header(COOKIE, bob_cookie)
            .await
            .json();
        assert_eq!(profile["user"]["rating"], 4);
        assert_eq!(profile["reviews"].as_array().unwrap().len(), 3);
        assert_eq!(profile["reviews"][0]["reviewer_name"], "Bob");
    }

    #[tokio::test]
    async fn test_category_matches_case_insensitively() {
        let (server, state) = setup_test_server().await;
        let (alice, cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;
        create_listing(&state, alice.id, "Novel", "Books", "Sell").await;
        create_listing(&state, alice.id, "Comic", "books", "Trade").await;
        create_listing(&state, alice.id, "Mug", "Kitchen", "Free").await;

        let response = server.get("/category/BOOKS").add_header(COOKIE, cookie).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let names: Vec<&str> = body["products"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Novel") && names.contains(&"Comic"));
    }

    #[tokio::test]
    async fn test_profile_updates() {
        let (server, state) = setup_test_server().await;
        let (alice, cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;

        server
            .post("/profile/update-name")
            .add_header(COOKIE, cookie.clone())
            .form(&[("name", "Alice Tan")])
            .await
            .assert_status(StatusCode::SEE_OTHER);
        server
            .post("/profile/update-course")
            .add_header(COOKIE, cookie.clone())
            .form(&[("course", "Business")])
            .await
            .assert_status(StatusCode::SEE_OTHER);
        server
            .post("/profile/update-description")
            .add_header(COOKIE, cookie.clone())
            .form(&[("description", "Selling my stuff")])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let no_file = server
            .post("/profile/update-image")
            .add_header(COOKIE, cookie.clone())
            .multipart(MultipartForm::new().add_text("note", "none"))
            .await;
        no_file.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = no_file.json();
        assert_eq!(body["message"], "No file uploaded.");

        let with_file = server
            .post("/profile/update-image")
            .add_header(COOKIE, cookie.clone())
            .multipart(MultipartForm::new().add_part("image", png_part("me.png")))
            .await;
        with_file.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(with_file.header(LOCATION), "/profile");

        let profile: Value = server.get("/profile").add_header(COOKIE, cookie.clone()).await.json();
        assert_eq!(profile["user"]["name"], "Alice Tan");
        assert_eq!(profile["user"]["course"], "Business");
        assert_eq!(profile["user"]["description"], "Selling my stuff");
        assert!(profile["user"]["image"].as_str().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(profile["session_user_id"], alice.id);

        let missing = server.get("/profile/9999").add_header(COOKIE, cookie).await;
        missing.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(missing.text(), "User not found");
    }

    #[tokio::test]
    async fn test_author_area_requires_authorisation() {
        let (server, state) = setup_test_server().await;
        let (_alice, cookie) = signed_in_user(&server, &state, ALICE, "Alice").await;

        let denied = server.get("/author").add_header(COOKIE, cookie.clone()).await;
        denied.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(denied.text(), AUTHOR_ONLY);

        // Granting access applies to the live session
        store::users::set_authorised(state.store.conn(), ALICE, true).await.unwrap();
        let allowed = server.get("/author").add_header(COOKIE, cookie).await;
        allowed.assert_status(StatusCode::OK);
        let body: Value = allowed.json();
        assert_eq!(body["settings"]["blog_title"], "Campus Blog");
    }

    #[tokio::test]
    async fn test_blog_publish_read_like_comment() {
        let (server, state) = setup_test_server().await;
        create_user(&state, ALICE, "Alice").await;
        store::users::set_authorised(state.store.conn(), ALICE, true).await.unwrap();
        let author = login(&server, ALICE).await;
        let (_bob, reader) = signed_in_user(&server, &state, BOB, "Bob").await;

        server
            .post("/author/settings")
            .add_header(COOKIE, author.clone())
            .form(&[("blogTitle", "Notes"), ("authorName", "Alice")])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        server
            .post("/author/edit")
            .add_header(COOKIE, author.clone())
            .form(&[("title", "Hello"), ("content", "First post"), ("status", "draft")])
            .await
            .assert_status(StatusCode::SEE_OTHER);
        let draft = store::articles::drafts(state.store.conn()).await.unwrap().remove(0);

        // Drafts are invisible to readers
        server
            .get(&format!("/reader/article/{}", draft.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let published = server
            .post(&format!("/author/publish-article/{}", draft.id))
            .add_header(COOKIE, author.clone())
            .await;
        published.assert_json(&json!({"success": true}));

        let home: Value = server.get("/reader").await.json();
        assert_eq!(home["settings"]["blog_title"], "Notes");
        assert_eq!(home["articles"][0]["title"], "Hello");

        let first: Value = server.get(&format!("/reader/article/{}", draft.id)).await.json();
        assert_eq!(first["article"]["reads"], 1);
        assert!(first["viewer"].is_null());

        let like = server.post(&format!("/reader/article/{}/like", draft.id)).await;
        like.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(like.header(LOCATION), format!("/reader/article/{}", draft.id).as_str());
        let liked = store::articles::find(state.store.conn(), draft.id).await.unwrap().unwrap();
        assert_eq!((liked.reads, liked.likes), (0, 1));

        let comment_path = format!("/reader/article/{}/comment", draft.id);
        let blank = server
            .post(&comment_path)
            .add_header(COOKIE, reader.clone())
            .form(&[("commenterName", "Bob"), ("commentContent", " ")])
            .await;
        blank.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = blank.json();
        assert_eq!(body["message"], COMMENT_FIELDS_REQUIRED);

        let anonymous = server
            .post(&comment_path)
            .form(&[("commenterName", "Anon"), ("commentContent", "Hi")])
            .await;
        anonymous.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(anonymous.header(LOCATION), "/login");

        server
            .post(&comment_path)
            .add_header(COOKIE, reader.clone())
            .form(&[("commenterName", "Bob"), ("commentContent", "Nice post")])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let page: Value = server
            .get(&format!("/reader/article/{}", draft.id))
            .add_header(COOKIE, reader.clone())
            .await
            .json();
        assert_eq!(page["comments"][0]["content"], "Nice post");
        assert_eq!(page["viewer"]["email"], BOB);
        let comment_id = page["comments"][0]["id"].as_i64().unwrap();

        let (_carol, stranger) = signed_in_user(&server, &state, CAROL, "Carol").await;
        let delete_path = format!("/reader/article/{}/comment/{}/delete", draft.id, comment_id);
        server
            .post(&delete_path)
            .add_header(COOKIE, stranger)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .post(&delete_path)
            .add_header(COOKIE, reader)
            .await
            .assert_status(StatusCode::SEE_OTHER);
        assert!(
            store::comments::for_article(state.store.conn(), draft.id)
                .await
                .unwrap()
                .is_empty()
        );

        server
            .delete(&format!("/author/delete-article/{}", draft.id))
            .add_header(COOKIE, author.clone())
            .await
            .assert_json(&json!({"success": true}));
        let gone = server
            .delete(&format!("/author/delete-article/{}", draft.id))
            .add_header(COOKIE, author)
            .await;
        gone.assert_status(StatusCode::NOT_FOUND);
        let body: Value = gone.json();
        assert_eq!(body["success"], false);
    }
}
