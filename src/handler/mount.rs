//! Mounting the handler on an axum router.

use axum::body::Body;
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::handler::StaticHandler;
use crate::routing::route_key;

impl StaticHandler {
    /// Mount the handler at `route`: the route itself, its trailing-slash
    /// form, and every path beneath it. `get` also answers `HEAD`.
    pub fn register_router(self: &Arc<Self>, route: &str, router: Router) -> Router {
        self.register_router_in_group("", route, router)
    }

    /// Like [`register_router`](Self::register_router), with `route`
    /// relative to a group prefix.
    pub fn register_router_in_group(self: &Arc<Self>, group: &str, route: &str, router: Router) -> Router {
        let mount = route_key(group, route);
        self.routes.add_prefix(&mount);
        tracing::info!(route = %mount, "Mounting static handler");

        let handler = Arc::clone(self);
        let serve = move |req: Request<Body>| {
            let handler = Arc::clone(&handler);
            async move { handler.serve(req).await }
        };

        if mount == "/" {
            return router
                .route("/", get(serve.clone()))
                .route("/{*file}", get(serve));
        }
        router
            .route(&mount, get(serve.clone()))
            .route(&format!("{}/", mount), get(serve.clone()))
            .route(&format!("{}/{{*file}}", mount), get(serve))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn handler() -> Arc<StaticHandler> {
        let fs = MemoryFs::new().with_file("testdata/test.txt", "This is a test file");
        Arc::new(StaticHandler::new(fs, &["testdata"]))
    }

    #[tokio::test]
    async fn test_mount_registers_prefix() {
        let h = handler();
        let app = h.register_router_in_group("/api", "/files/", Router::new());
        assert_eq!(h.registered_routes().as_slice(), ["/api/files".to_string()]);

        let req = Request::builder()
            .uri("/api/files/test.txt")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_root_mount() {
        let h = handler();
        let app = h.register_router("/", Router::new());

        let req = Request::builder().uri("/test.txt").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
