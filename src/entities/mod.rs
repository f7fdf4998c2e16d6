pub mod closure_edge;
pub mod grant;
pub mod membership;
pub mod party;
pub mod resource;

pub use closure_edge::Entity as ClosureEdge;
pub use grant::Entity as Grant;
pub use membership::Entity as Membership;
pub use party::Entity as Party;
pub use resource::Entity as Resource;
