pub mod api_router;
pub mod charts;
pub mod controls;
pub mod core;
pub mod evidence;
pub mod frameworks;
pub mod main_module;
pub mod policies;
pub mod projects;
pub mod tags;
