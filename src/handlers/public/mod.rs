// Public handlers: token acquisition and reference data. No identity required.

pub mod reference;
pub mod register;
pub mod session;
