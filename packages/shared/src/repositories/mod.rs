pub mod dynamodb;
pub mod errors;
pub mod game_repository;
pub mod sqlite;
pub mod user_repository;
