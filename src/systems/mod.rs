//! Systems module - the ricochet simulation stages and their ECS systems.

pub mod bounce;
pub mod classify;
pub mod debug;
pub mod dispatch;
pub mod hierarchy;
pub mod motion;
pub mod reflection;
