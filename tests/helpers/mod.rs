pub mod db;
pub mod fixtures;

pub use builders::{create_chain, create_group, create_person, create_w, Chain, FolderBuilder};
pub use db::TestDb;
