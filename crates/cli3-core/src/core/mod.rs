pub mod events;
pub mod reference;
pub mod request;
pub mod request_log;
pub mod session;
pub mod table;
pub mod window;
pub mod workspace;
