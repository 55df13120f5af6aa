//! In-process HTTP fixtures for client tests.

use axum::Router;

use crate::config::SessionConfig;

/// Serve `router` on an ephemeral localhost port and return its origin.
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// An origin nothing is listening on.
pub(crate) async fn dead_origin() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub(crate) fn config_for(origin: &str) -> SessionConfig {
    SessionConfig::default().with_base_url(origin).unwrap()
}
