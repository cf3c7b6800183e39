pub mod chess_service_errors;
pub mod game_service_errors;
pub mod move_coordinator_errors;
pub mod user_service_errors;
