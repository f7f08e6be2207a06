//! Input decisions: the boundary key table and the context menu

pub mod context_menu;
pub mod interceptor;
