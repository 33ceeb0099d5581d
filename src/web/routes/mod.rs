pub mod item_routes;
pub mod tag_routes;
