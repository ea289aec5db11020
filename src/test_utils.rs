#[cfg(test)]
pub mod test_utils {
    use crate::auth::hash_password;
    use crate::config::{app_state, Settings};
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::http::{header::SET_COOKIE, HeaderValue};
    use axum::Router;
    use axum_test::TestServer;
    use migration::{Migrator, MigratorTrait};
    use model::entities::{product, user};
    use rust_decimal::Decimal;
    use sea_orm::Database;
    use store::images::NewImage;
    use store::products::ProductDetails;
    use store::users::NewUser;
    use store::Store;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    pub const TEST_PASSWORD: &str = "password123";

    /// Create an in-memory SQLite store with every migration applied
    pub async fn setup_test_store() -> Store {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");
        let store = Store::new(db);
        store
            .enable_foreign_keys()
            .await
            .expect("Failed to enable foreign keys");

        // Run migrations
        Migrator::up(store.conn(), None)
            .await
            .expect("Failed to run migrations");

        store
    }

    /// Default settings with a private uploads directory
    pub fn test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.uploads.dir = std::env::temp_dir().join(format!(
            "campusmart-test-{}",
            uuid::Uuid::new_v4().simple()
        ));
        settings
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        app_state(setup_test_store().await, test_settings())
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level comes from RUST_LOG and defaults to WARN.
    pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        create_router(setup_test_app_state().await)
    }

    /// Test server plus the state behind it, for seeding and inspecting the store
    pub async fn setup_test_server() -> (TestServer, AppState) {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).expect("Failed to start test server");
        (server, state)
    }

    /// Registers an account directly in the store with [`TEST_PASSWORD`]
    pub async fn create_user(state: &AppState, email: &str, name: &str) -> user::Model {
        store::users::create(
            state.store.conn(),
            NewUser {
                email: email.to_string(),
                name: name.to_string(),
                password_hash: hash_password(TEST_PASSWORD).expect("Failed to hash password"),
                course: "Computer Science".to_string(),
                description: format!("{} studies here", name),
            },
        )
        .await
        .expect("Failed to create user")
    }

    /// Signs in through `/login` and returns the `Cookie` header value for later requests
    pub async fn login(server: &TestServer, email: &str) -> HeaderValue {
        let response = server
            .post("/login")
            .form(&[("email", email), ("password", TEST_PASSWORD)])
            .await;
        let set_cookie = response.header(SET_COOKIE);
        let pair = set_cookie
            .to_str()
            .expect("Set-Cookie is not ASCII")
            .split(';')
            .next()
            .expect("Set-Cookie is empty")
            .to_string();
        HeaderValue::from_str(&pair).expect("Invalid cookie pair")
    }

    /// Creates a user and signs them in
    pub async fn signed_in_user(
        server: &TestServer,
        state: &AppState,
        email: &str,
        name: &str,
    ) -> (user::Model, HeaderValue) {
        let user = create_user(state, email, name).await;
        let cookie = login(server, email).await;
        (user, cookie)
    }

    /// Stores a listing with one small image
    pub async fn create_listing(
        state: &AppState,
        owner_id: i32,
        name: &str,
        category: &str,
        transaction_type: &str,
    ) -> product::Model {
        store::products::create_with_images(
            state.store.conn(),
            owner_id,
            ProductDetails {
                name: name.to_string(),
                description: format!("A used {}", name),
                price: Decimal::new(1500, 2),
                category: category.to_string(),
                transaction_type: transaction_type.to_string(),
                condition: "Good".to_string(),
            },
            vec![NewImage {
                bytes: vec![0x89, b'P', b'N', b'G'],
                mime: "image/png".to_string(),
            }],
        )
        .await
        .expect("Failed to create listing")
    }
}
