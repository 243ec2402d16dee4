pub mod config;
pub mod emailer;
pub mod gateway;
pub mod sanitize;
pub mod server;
pub mod validation;

pub use config::{Config, FieldPolicy, FieldType};
pub use emailer::Emailer;
pub use gateway::{EmailTemplateData, FormField, FormResponse, GatewayEngine};
pub use server::Server;
