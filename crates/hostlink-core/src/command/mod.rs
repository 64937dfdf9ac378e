pub mod end_code;
pub mod opcode;
pub mod request;
pub mod response;

pub use end_code::EndCode;
pub use opcode::Opcode;
pub use request::*;
pub use response::*;
