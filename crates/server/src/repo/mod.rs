pub mod auth;
pub mod case;
pub mod consultation;
pub mod dashboard;
pub mod document;
pub mod expense;
pub mod inquiry;
pub mod jail;
pub mod jail_visit;
pub mod message;
pub mod notification;
pub mod occupation;
pub mod payment;
pub mod police_station;
pub mod quotation;
pub mod setting;
pub mod subscription;
pub mod taxonomy;
pub mod tracking;
pub mod user;
