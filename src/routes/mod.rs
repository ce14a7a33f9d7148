pub mod api;
pub mod relay;

pub use api::create_api_routes;
pub use relay::create_ws_routes;
