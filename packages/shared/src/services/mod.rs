pub mod chess_service;
pub mod errors;
pub mod game_service;
pub mod move_coordinator;
pub mod rules_engine;
pub mod user_service;
