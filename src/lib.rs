pub mod api;
pub mod classify;
pub mod commands;
pub mod config;
pub mod entity;
pub mod error;
pub mod input;
pub mod lister;
pub mod network;
pub mod reverse;
pub mod servers;
pub mod zone;

pub use api::{BamApi, BamApiExt, BamClient, Params};
pub use classify::{Identifier, Scope, classify, resolve_identifier};
pub use entity::{Entity, EntityId, Properties};
pub use error::{BamError, ConfigError, Result};
pub use reverse::{Cidr, cidr_to_zone_name, zone_name_to_cidr};
