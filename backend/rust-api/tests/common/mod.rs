use cybered_api::config::Config;
use mongodb::Database;
use redis::aio::ConnectionManager;

/// Connects to the test MongoDB/Redis instances and hands out the pieces
/// the service constructors take. Each test isolates itself with a unique
/// user id, so no cross-test cleanup is needed.
pub async fn test_context() -> (Database, ConnectionManager, Config) {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    // Load test environment from .env.test
    dotenvy::from_filename(".env.test").ok();

    let config = Config::load().expect("Failed to load test configuration");

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to test MongoDB");
    let mongo = mongo_client.database(&config.mongo_database);

    let redis_client =
        redis::Client::open(config.redis_uri.clone()).expect("Failed to create test Redis client");
    let redis = ConnectionManager::new(redis_client)
        .await
        .expect("Failed to connect to test Redis");

    (mongo, redis, config)
}

pub fn unique_user() -> String {
    format!("test-user-{}", uuid::Uuid::new_v4())
}
