//! Header sessions stored in Redis
//!
//! Clients send the id back in `X-SESSION-ID`:
//!
//! ```text
//! curl -i http://127.0.0.1:5800/
//! curl -i -H 'X-SESSION-ID: <id>' http://127.0.0.1:5800/
//! ```

use salvo::prelude::*;
use salvo_cache_session::{HeaderConfig, RedisCache, SessionDepotExt, SessionHandler, Value};
use std::time::Duration;

#[handler]
async fn index(depot: &mut Depot) -> String {
    let session = depot.session_mut().expect("Session not found");

    let (views, _) = session.uint32("views", 0);
    session.set("views", views + 1);

    format!("Views: {}\nSession ID: {}", views + 1, session.id())
}

#[handler]
async fn dump(depot: &mut Depot) -> Json<serde_json::Value> {
    let session = depot.session_mut().expect("Session not found");

    let values = session
        .all()
        .into_iter()
        .map(|(key, value)| {
            let shown = match value {
                Value::Json(json) => json,
                other => serde_json::json!({ "type": other.type_name(), "debug": format!("{:?}", other) }),
            };
            (key, shown)
        })
        .collect::<serde_json::Map<_, _>>();

    Json(serde_json::json!({
        "sessionId": session.id(),
        "values": values,
    }))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let cache = RedisCache::from_url(&redis_url)
        .await
        .expect("Failed to connect to Redis");

    let config = HeaderConfig::new().with_expiration(Duration::from_secs(30 * 60));

    let router = Router::new()
        .hoop(SessionHandler::header(cache, config))
        .get(index)
        .push(Router::with_path("dump").get(dump));

    let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
    println!("Server running at http://127.0.0.1:5800 (redis: {})", redis_url);

    Server::new(acceptor).serve(router).await;
}
