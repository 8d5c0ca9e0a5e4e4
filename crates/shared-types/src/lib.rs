pub mod error;
pub mod feature_flags;

// ELSY domain modules
pub mod auth;
pub mod case;
pub mod common;
pub mod consultation;
pub mod dashboard;
pub mod detention;
pub mod document;
pub mod inquiry;
pub mod message;
pub mod notification;
pub mod payment;
pub mod quotation;
pub mod setting;
pub mod subscription;
pub mod taxonomy;
pub mod user;

pub use error::*;
pub use feature_flags::*;

pub use auth::*;
pub use case::*;
pub use common::*;
pub use consultation::*;
pub use dashboard::*;
pub use detention::*;
pub use document::*;
pub use inquiry::*;
pub use message::*;
pub use notification::*;
pub use payment::*;
pub use quotation::*;
pub use setting::*;
pub use subscription::*;
pub use taxonomy::*;
pub use user::*;
