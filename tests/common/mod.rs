#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::body::BoxBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::test::TestRequest;
use actix_web::web::Data;
use actix_web::{App, Error};

use school_admin::auth::jwt::generate_token;
use school_admin::config::Config;
use school_admin::ledger::{LiveRoster, RosterReader};
use school_admin::model::Role;
use school_admin::routes;
use school_admin::store::{DocumentStore, MemoryStore};

pub const SECRET: &str = "test-secret";
pub const YEAR: &str = "academic_2024-2025";

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub roster: LiveRoster,
    pub config: Config,
}

impl TestContext {
    /// Starts the live roster over a store that already holds the seed data.
    pub async fn start(store: Arc<MemoryStore>) -> Self {
        let roster = LiveRoster::start(store.clone()).await.expect("roster starts");
        Self {
            store,
            roster,
            config: test_config(),
        }
    }

    pub fn reader(&self) -> RosterReader {
        self.roster.reader()
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<BoxBody>,
            Error = Error,
            InitError = (),
        > + use<>,
    > {
        let store: Arc<dyn DocumentStore> = self.store.clone();
        let config = self.config.clone();

        App::new()
            .app_data(Data::from(store))
            .app_data(Data::new(self.reader()))
            .app_data(Data::new(self.config.clone()))
            .configure(move |cfg| routes::configure(cfg, config))
    }
}

pub fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".to_string(),
        jwt_secret: SECRET.to_string(),
        database_url: None,
        rate_protected_per_min: 1000,
        api_prefix: "/api".to_string(),
        log_dir: "logs".to_string(),
    }
}

pub fn token(role: Role) -> String {
    generate_token("office@school", role, SECRET, 3600).expect("token")
}

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().expect("peer addr")
}

/// Request from a fixed peer (the rate limiter keys on it) carrying a bearer
/// token for `role`.
pub fn authed(req: TestRequest, role: Role) -> TestRequest {
    req.peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {}", token(role))))
}

pub fn anonymous(req: TestRequest) -> TestRequest {
    req.peer_addr(peer())
}
