pub mod controller;

pub use controller::PlayerController;
