pub mod domain;
pub mod ports;

pub use domain::{Credential, DoctorSummary, Message, NewUser, Profile, Role, Room};
pub use ports::{AuthApi, AuthError, ChatApi, ChatError, CredentialStore, RequestError};
