//! Cookie sessions with an in-memory cache and CSRF tokens

use salvo::prelude::*;
use salvo_cache_session::{CookieConfig, CsrfHandler, MemoryCache, SameSite, SessionDepotExt, SessionHandler};
use std::time::Duration;

#[handler]
async fn index(depot: &mut Depot) -> String {
    let session = depot.session_mut().expect("Session not found");

    let (views, _) = session.int64("views", 0);
    session.set("views", views + 1);

    format!(
        "Hello! You have viewed this page {} time(s).\nSession ID: {}\nCSRF token: {}",
        views + 1,
        session.id(),
        depot.csrf_token()
    )
}

#[handler]
async fn get_user(depot: &mut Depot) -> String {
    let session = depot.session_mut().expect("Session not found");

    match session.string("user", String::new()) {
        (user, true) => format!("Logged in as: {}", user),
        _ => "Not logged in".to_string(),
    }
}

#[handler]
async fn login(req: &mut Request, depot: &mut Depot, res: &mut Response) -> String {
    let session = depot.session_mut().expect("Session not found");
    let username = req.query::<String>("name").unwrap_or_else(|| "anonymous".to_string());

    // New identity on privilege change
    if let Err(e) = session.regenerate(res).await {
        tracing::error!("Failed to regenerate session: {}", e);
    }
    session.set("user", username.as_str());

    format!("User set to: {}", username)
}

#[handler]
async fn logout(depot: &mut Depot) -> &'static str {
    let session = depot.session_mut().expect("Session not found");

    if let Err(e) = session.destroy().await {
        tracing::error!("Failed to destroy session: {}", e);
    }

    "Logged out"
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cache = MemoryCache::new();

    let config = CookieConfig::new()
        .with_cookie_name("session")
        .with_same_site(SameSite::Lax)
        .with_expiration(Duration::from_secs(3600));

    let router = Router::new()
        .hoop(SessionHandler::cookie(cache, config))
        .hoop(CsrfHandler::new())
        .get(index)
        .push(Router::with_path("user").get(get_user))
        .push(Router::with_path("login").get(login))
        .push(Router::with_path("logout").get(logout));

    let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
    println!("Server running at http://127.0.0.1:5800");
    println!("Try these endpoints:");
    println!("  GET /                 - View counter");
    println!("  GET /user             - Get current user");
    println!("  GET /login?name=alice - Log in (issues a new session id)");
    println!("  GET /logout           - Destroy session");

    Server::new(acceptor).serve(router).await;
}
