pub mod encode;
pub mod hash;
pub mod module;
pub mod registry;
