pub mod domain;
pub mod ports;

pub use domain::{
    Account, AccountCredentials, FlashQueues, SessionData, SessionRecord, FLASH_ERROR,
    FLASH_SUCCESS,
};
pub use ports::{AccountStore, PortError, PortResult, SessionStore};
