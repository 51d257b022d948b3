pub mod plans;
pub mod subscriptions;
pub mod webhooks;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/subscriptions",
        subscriptions::router()
            .merge(plans::router())
            .merge(webhooks::router()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::{
        infra::app::create_app,
        test_utils::{TestAppStateBuilder, user_bearer},
    };

    #[tokio::test]
    async fn full_app_serves_under_api_prefix() {
        let server = TestServer::new(create_app(TestAppStateBuilder::new().build())).unwrap();

        server
            .get("/api/subscriptions/plans")
            .await
            .assert_status_ok();

        let response = server
            .get("/api/subscriptions")
            .add_header("Authorization", user_bearer(uuid::Uuid::new_v4()))
            .await;
        response.assert_status_ok();
        response.assert_header("x-content-type-options", "nosniff");

        server
            .get("/api/subscriptions/unknown-route")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
