//! Domain layer: the provisioning data model and the ports through which the
//! workflow reaches its collaborators.

pub mod message;
pub mod notification;
pub mod outcome;
pub mod ports;
pub mod request;
pub mod retry;
pub mod status;
