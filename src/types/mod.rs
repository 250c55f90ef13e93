mod models;
mod resource;
mod visibility;

pub use models::*;
pub use resource::OwnedResource;
pub use visibility::Visibility;
