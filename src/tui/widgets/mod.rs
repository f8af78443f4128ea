pub mod sidebar;
pub mod status_bar;
pub mod transcript;
