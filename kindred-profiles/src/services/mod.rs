pub mod image_normalizer;
pub mod match_engine;
pub mod password;
pub mod photo_service;
pub mod profile_service;
