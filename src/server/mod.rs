//! The authoritative game server the clients poll.

pub mod game_handlers;

use std::time::Instant;

use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::models::{ActionRequest, AppState, CreateGameRequest, PollQuery};

/// `POST /api/games`
pub async fn create_game(
    state: web::Data<AppState>,
    body: web::Json<CreateGameRequest>,
) -> Result<HttpResponse, ApiError> {
    let created = game_handlers::handle_create(&state, body.into_inner(), Instant::now())?;
    Ok(HttpResponse::Ok().json(created))
}

/// `GET /api/online-move`
pub async fn poll_game(
    state: web::Data<AppState>,
    query: web::Query<PollQuery>,
) -> Result<HttpResponse, ApiError> {
    let view = game_handlers::handle_poll(&state, &query, Instant::now())?;
    Ok(HttpResponse::Ok().json(view))
}

/// `POST /api/online-move`
pub async fn post_action(
    state: web::Data<AppState>,
    body: web::Json<ActionRequest>,
) -> Result<HttpResponse, ApiError> {
    let response = game_handlers::handle_action(&state, body.into_inner(), Instant::now())?;
    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use crate::config::ServerConfig;
    use crate::models::{ActionResponse, CreateGameResponse, PollResponse, ServerStatus};
    use crate::routes::configure_routes;

    use super::*;

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState::new(ServerConfig::default()))
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .configure(configure_routes),
            )
            .await
        };
    }

    macro_rules! create {
        ($app:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/games")
                .set_json(json!({
                    "white_user_id": "alice",
                    "black_user_id": "bob",
                    "time_control": "blitz"
                }))
                .to_request();
            let created: CreateGameResponse = test::call_and_read_body_json(&$app, req).await;
            created.game_id
        }};
    }

    fn poll_uri(game_id: &str, user_id: &str) -> String {
        format!("/api/online-move?game_id={game_id}&user_id={user_id}")
    }

    fn action(body: Value) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/online-move")
            .set_json(body)
    }

    #[actix_rt::test]
    async fn test_created_game_is_polled_by_both_players() {
        let data = state();
        let app = app!(data);
        let game_id = create!(app);

        let req = test::TestRequest::get()
            .uri(&poll_uri(&game_id, "bob"))
            .to_request();
        let view: PollResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view.status, ServerStatus::Playing);
        assert_eq!(view.white_user_id, "alice");
        assert_eq!(view.black_time, 180);
        assert_eq!(view.move_history, "");
    }

    #[actix_rt::test]
    async fn test_move_is_appended_and_stale_number_conflicts() {
        let data = state();
        let app = app!(data);
        let game_id = create!(app);

        let first = json!({
            "action": "move", "game_id": game_id, "user_id": "alice",
            "move": "e2-e4", "game_status": "playing", "move_number": 1
        });
        let req = action(first.clone()).to_request();
        let resp: ActionResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.move_count, Some(1));

        let resp = test::call_service(&app, action(first).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let stale = json!({
            "action": "move", "game_id": game_id, "user_id": "bob",
            "move": "e7-e5", "game_status": "playing", "move_number": 1
        });
        let resp = test::call_service(&app, action(stale).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("stale"));

        let req = test::TestRequest::get()
            .uri(&poll_uri(&game_id, "alice"))
            .to_request();
        let view: PollResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view.move_history, "e2-e4");
        assert_eq!(view.move_number, 1);
    }

    #[actix_rt::test]
    async fn test_unknown_game_and_stranger_are_refused() {
        let data = state();
        let app = app!(data);
        let game_id = create!(app);

        let req = test::TestRequest::get()
            .uri(&poll_uri("missing", "alice"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let resign = json!({"action": "resign", "game_id": game_id, "user_id": "mallory"});
        let resp = test::call_service(&app, action(resign).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_rt::test]
    async fn test_resign_then_rematch_creates_swapped_game() {
        let data = state();
        let app = app!(data);
        let game_id = create!(app);

        let resign = json!({"action": "resign", "game_id": game_id, "user_id": "alice"});
        let req = action(resign).to_request();
        let resp: ActionResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.status, "finished");
        assert_eq!(resp.winner.as_deref(), Some("bob"));

        let offer = json!({"action": "offer_rematch", "game_id": game_id, "user_id": "bob"});
        let req = action(offer).to_request();
        let resp: ActionResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.status, "rematch_offered");

        let accept = json!({"action": "accept_rematch", "game_id": game_id, "user_id": "alice"});
        let req = action(accept).to_request();
        let resp: ActionResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.status, "rematch_accepted");
        let new_id = resp.new_game_id.unwrap();
        assert_eq!(resp.player_color, Some(crate::engine::Color::Black));

        let req = test::TestRequest::get()
            .uri(&poll_uri(&new_id, "alice"))
            .to_request();
        let view: PollResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view.white_user_id, "bob");
        assert_eq!(view.time_control.to_string(), "3+2");
    }

    #[actix_rt::test]
    async fn test_malformed_body_gets_json_error() {
        let data = state();
        let app = app!(data);
        let req = test::TestRequest::post()
            .uri("/api/online-move")
            .set_json(json!({"action": "teleport"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }
}
