// Not every test binary exercises every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bloomshop_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::flower::{self, FlowerCategory},
    entities::shipping_address,
    entities::user::{self, UserRole},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

const TEST_JWT_SECRET: &str =
    "integration-test-signing-key-0123456789-abcdefghijklmnopqrstuvwxyz-0987654321";

/// Test harness: application state over a scratch sqlite database with
/// migrations applied, plus the assembled router for HTTP-level tests.
pub struct TestApp {
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    pub router: axum::Router,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = db_dir.path().join("bloomshop_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(
            AuthConfig::new(
                cfg.jwt_secret.clone(),
                cfg.auth_issuer.clone(),
                Duration::from_secs(cfg.jwt_expiration as u64),
            ),
            db_arc.clone(),
            event_sender.clone(),
        ));

        let services = AppServices::new(db_arc.clone(), event_sender.clone(), &cfg);
        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = axum::Router::new().nest(
            "/api",
            bloomshop_api::api_routes(state.clone(), auth_service.clone()),
        );

        Self {
            state,
            auth_service,
            router,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// Inserts an account with the given role. Password is "petals123".
    pub async fn seed_user(&self, role: UserRole) -> user::Model {
        let suffix = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(format!("user-{}", &suffix[..12])),
            email: Set(format!("user-{}@example.com", &suffix[..12])),
            password_hash: Set(AuthService::hash_password("petals123").expect("hash password")),
            phone: Set(None),
            role: Set(role),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(&*self.state.db).await.expect("seed user")
    }

    /// Issues a valid bearer token for a seeded user.
    pub fn token_for(&self, user: &user::Model) -> String {
        self.auth_service
            .generate_token(user)
            .expect("generate token")
    }

    pub async fn seed_flower(&self, name: &str, price: Decimal, stock: i32) -> flower::Model {
        let now = Utc::now();
        let model = flower::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(format!("{} (test arrangement)", name))),
            price: Set(price),
            image: Set(None),
            category: Set(FlowerCategory::Mixed),
            stock: Set(stock),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(&*self.state.db).await.expect("seed flower")
    }

    pub async fn seed_address(&self, user_id: Uuid) -> shipping_address::Model {
        let now = Utc::now();
        let model = shipping_address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            street: Set("12 Orchid Lane".to_string()),
            city: Set("Phnom Penh".to_string()),
            commune: Set("Boeung Keng Kang".to_string()),
            province: Set("Phnom Penh".to_string()),
            postal_code: Set(Some("12302".to_string())),
            country: Set("Cambodia".to_string()),
            label: Set(Some("Home".to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(&*self.state.db).await.expect("seed address")
    }
}
